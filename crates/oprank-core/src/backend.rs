//! The backend seam: everything the resolver needs from 1Password.
//!
//! Production code plugs in the Connect Server client; tests use the
//! in-memory [`MockClient`](crate::testing::MockClient). Implementations must
//! be safe to share across tasks since one provider may serve concurrent
//! callers.

use std::future::Future;
use std::pin::Pin;

use crate::types::{File, Item, ItemSummary, Vault};

/// Any transport or query failure reported by a backend.
pub type BackendError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Boxed future returned by [`BackendClient`] methods.
pub type BackendFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, BackendError>> + Send + 'a>>;

/// Read-only access to vaults, items and file contents.
pub trait BackendClient: Send + Sync {
    /// All vaults whose name equals `name`. May be empty or contain several.
    fn find_vaults_by_name<'a>(&'a self, name: &'a str) -> BackendFuture<'a, Vec<Vault>>;

    /// Items titled `title` inside the vault with id `vault_id`.
    fn find_items_by_title<'a>(
        &'a self,
        title: &'a str,
        vault_id: &'a str,
    ) -> BackendFuture<'a, Vec<ItemSummary>>;

    /// The item with all fields and file descriptors populated.
    fn get_item<'a>(&'a self, item_id: &'a str, vault_id: &'a str) -> BackendFuture<'a, Item>;

    /// Raw contents of a document file.
    fn get_file_content<'a>(&'a self, file: &'a File) -> BackendFuture<'a, Vec<u8>>;

    /// Every item in the vault named `vault_name`. Used only for liveness checks.
    fn list_items<'a>(&'a self, vault_name: &'a str) -> BackendFuture<'a, Vec<ItemSummary>>;
}
