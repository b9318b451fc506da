//! In-memory [`BackendClient`] for tests.
//!
//! `MockClient` is assembled with chained builder calls, mirroring how a
//! store would look after a few vaults and items were created in it:
//!
//! ```text
//! let client = MockClient::new()
//!     .add_predictable_vault("my-vault")
//!     .add_predictable_item_with_field("my-vault", "my-item", "password", "hunter2");
//! ```
//!
//! "Predictable" ids are derived from names: vault `my-vault` gets id
//! `my-vault-id`, item `my-item` gets id `my-item-id`.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, PoisonError};

use crate::backend::{BackendClient, BackendError, BackendFuture};
use crate::types::{Field, File, Item, ItemSummary, ItemVault, Vault};

/// Backend operations, used to inject failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOp {
    FindVaults,
    FindItems,
    GetItem,
    GetFileContent,
    ListItems,
}

/// A recorded backend call with its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    FindVaults(String),
    FindItems { title: String, vault_id: String },
    GetItem { item_id: String, vault_id: String },
    GetFileContent(String),
    ListItems(String),
}

impl MockCall {
    pub fn op(&self) -> MockOp {
        match self {
            Self::FindVaults(_) => MockOp::FindVaults,
            Self::FindItems { .. } => MockOp::FindItems,
            Self::GetItem { .. } => MockOp::GetItem,
            Self::GetFileContent(_) => MockOp::GetFileContent,
            Self::ListItems(_) => MockOp::ListItems,
        }
    }
}

/// Error returned by [`MockClient`] lookups and injected failures.
#[derive(Debug, thiserror::Error)]
pub enum MockError {
    #[error("injected failure: {0}")]
    Injected(String),

    #[error("mock resource not found: {0}")]
    NotFound(String),

    #[error("expected one vault named '{name}', got {count}")]
    AmbiguousVault { name: String, count: usize },
}

#[derive(Debug, Default)]
pub struct MockClient {
    /// Vaults keyed by the name they are returned for.
    vaults: HashMap<String, Vec<Vault>>,
    /// Items keyed by owning vault id, in insertion order.
    items: HashMap<String, Vec<Item>>,
    /// File contents keyed by file name.
    file_contents: HashMap<String, Vec<u8>>,
    /// File contents keyed by file id; checked before names.
    file_contents_by_id: HashMap<String, Vec<u8>>,
    failures: HashMap<MockOp, String>,
    /// Vault names whose lookup fails; other names still resolve.
    failing_vaults: HashSet<String>,
    calls: Mutex<Vec<MockCall>>,
}

impl MockClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a vault named `name` with id `<name>-id`.
    pub fn add_predictable_vault(self, name: &str) -> Self {
        let vault = Vault::new(format!("{name}-id"), name);
        self.append_vault(name, vault)
    }

    /// Add item `title` (id `<title>-id`) with a single field to vault `vault_name`.
    pub fn add_predictable_item_with_field(
        self,
        vault_name: &str,
        title: &str,
        label: &str,
        value: &str,
    ) -> Self {
        let vault_id = format!("{vault_name}-id");
        let item = Item {
            id: format!("{title}-id"),
            title: title.to_owned(),
            vault: ItemVault {
                id: vault_id.clone(),
            },
            category: String::new(),
            fields: vec![Field::new(label, value)],
            files: vec![],
        };
        self.append_item(&vault_id, item)
    }

    /// Make `vault` one of the results of looking up `name`.
    pub fn append_vault(mut self, name: &str, vault: Vault) -> Self {
        self.vaults.entry(name.to_owned()).or_default().push(vault);
        self
    }

    pub fn append_item(mut self, vault_id: &str, item: Item) -> Self {
        self.items.entry(vault_id.to_owned()).or_default().push(item);
        self
    }

    /// Append `field` to the first item `item_id` in vault `vault_id`.
    pub fn append_item_field(mut self, vault_id: &str, item_id: &str, field: Field) -> Self {
        if let Some(item) = self
            .items
            .get_mut(vault_id)
            .and_then(|items| items.iter_mut().find(|i| i.id == item_id))
        {
            item.fields.push(field);
        }
        self
    }

    pub fn set_file_contents(mut self, name: &str, contents: impl Into<Vec<u8>>) -> Self {
        self.file_contents.insert(name.to_owned(), contents.into());
        self
    }

    /// Contents for the file with id `file_id`, taking precedence over names.
    pub fn set_file_contents_by_id(mut self, file_id: &str, contents: impl Into<Vec<u8>>) -> Self {
        self.file_contents_by_id
            .insert(file_id.to_owned(), contents.into());
        self
    }

    /// Make every call of kind `op` fail with `message`.
    pub fn fail_on(mut self, op: MockOp, message: &str) -> Self {
        self.failures.insert(op, message.to_owned());
        self
    }

    /// Make vault lookups (and item listings) for `name` fail.
    pub fn fail_vault(mut self, name: &str) -> Self {
        self.failing_vaults.insert(name.to_owned());
        self
    }

    /// Calls received so far, oldest first.
    pub fn calls(&self) -> Vec<MockCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn count(&self, op: MockOp) -> usize {
        self.calls().iter().filter(|c| c.op() == op).count()
    }

    fn record(&self, call: MockCall) -> Result<(), BackendError> {
        let op = call.op();
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
        match self.failures.get(&op) {
            Some(message) => Err(MockError::Injected(message.clone()).into()),
            None => Ok(()),
        }
    }

    fn vaults_named(&self, name: &str) -> Result<Vec<Vault>, BackendError> {
        if self.failing_vaults.contains(name) {
            return Err(MockError::Injected(format!("vault '{name}' unavailable")).into());
        }
        Ok(self.vaults.get(name).cloned().unwrap_or_default())
    }

    fn do_find_items(&self, title: &str, vault_id: &str) -> Result<Vec<ItemSummary>, BackendError> {
        self.record(MockCall::FindItems {
            title: title.to_owned(),
            vault_id: vault_id.to_owned(),
        })?;
        Ok(self
            .items
            .get(vault_id)
            .map(|items| {
                items
                    .iter()
                    .filter(|i| i.title == title)
                    .map(Item::summary)
                    .collect()
            })
            .unwrap_or_default())
    }

    fn do_get_item(&self, item_id: &str, vault_id: &str) -> Result<Item, BackendError> {
        self.record(MockCall::GetItem {
            item_id: item_id.to_owned(),
            vault_id: vault_id.to_owned(),
        })?;
        self.items
            .get(vault_id)
            .and_then(|items| items.iter().find(|i| i.id == item_id))
            .cloned()
            .ok_or_else(|| MockError::NotFound(format!("item {item_id} in vault {vault_id}")).into())
    }

    fn do_get_file_content(&self, file: &File) -> Result<Vec<u8>, BackendError> {
        self.record(MockCall::GetFileContent(file.name.clone()))?;
        self.file_contents_by_id
            .get(&file.id)
            .or_else(|| self.file_contents.get(&file.name))
            .cloned()
            .ok_or_else(|| MockError::NotFound(format!("file {}", file.name)).into())
    }

    fn do_list_items(&self, vault_name: &str) -> Result<Vec<ItemSummary>, BackendError> {
        self.record(MockCall::ListItems(vault_name.to_owned()))?;
        let vaults = self.vaults_named(vault_name)?;
        let vault = match vaults.as_slice() {
            [vault] => vault,
            [] => return Err(MockError::NotFound(format!("vault '{vault_name}'")).into()),
            _ => {
                return Err(MockError::AmbiguousVault {
                    name: vault_name.to_owned(),
                    count: vaults.len(),
                }
                .into());
            }
        };
        Ok(self
            .items
            .get(&vault.id)
            .map(|items| items.iter().map(Item::summary).collect())
            .unwrap_or_default())
    }
}

impl BackendClient for MockClient {
    fn find_vaults_by_name<'a>(&'a self, name: &'a str) -> BackendFuture<'a, Vec<Vault>> {
        let result = self
            .record(MockCall::FindVaults(name.to_owned()))
            .and_then(|()| self.vaults_named(name));
        Box::pin(std::future::ready(result))
    }

    fn find_items_by_title<'a>(
        &'a self,
        title: &'a str,
        vault_id: &'a str,
    ) -> BackendFuture<'a, Vec<ItemSummary>> {
        Box::pin(std::future::ready(self.do_find_items(title, vault_id)))
    }

    fn get_item<'a>(&'a self, item_id: &'a str, vault_id: &'a str) -> BackendFuture<'a, Item> {
        Box::pin(std::future::ready(self.do_get_item(item_id, vault_id)))
    }

    fn get_file_content<'a>(&'a self, file: &'a File) -> BackendFuture<'a, Vec<u8>> {
        Box::pin(std::future::ready(self.do_get_file_content(file)))
    }

    fn list_items<'a>(&'a self, vault_name: &'a str) -> BackendFuture<'a, Vec<ItemSummary>> {
        Box::pin(std::future::ready(self.do_list_items(vault_name)))
    }
}
