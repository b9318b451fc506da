//! Caller-facing secret access.
//!
//! `OnePasswordProvider` pairs an authenticated backend with the vault-rank
//! configuration and exposes the operations a secret-sync controller needs.
//! Registration into any host framework is left to the host.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::backend::BackendClient;
use crate::error::{BackendStage, ResolveError};
use crate::extract::ValueExtractor;
use crate::order::{VaultOrderIndex, VaultRank};
use crate::resolve::ItemResolver;
use crate::secret::SecretValue;
use crate::types::{Item, SecretReference};

pub struct OnePasswordProvider {
    client: Arc<dyn BackendClient>,
    order: VaultOrderIndex,
}

impl fmt::Debug for OnePasswordProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OnePasswordProvider")
            .field("vaults", &self.order.to_string())
            .finish()
    }
}

impl OnePasswordProvider {
    /// Create a provider over `client`, consulting `vaults` by ascending rank.
    pub fn new(client: Arc<dyn BackendClient>, vaults: &HashMap<String, VaultRank>) -> Self {
        Self {
            client,
            order: VaultOrderIndex::new(vaults),
        }
    }

    /// The precedence order resolution walks.
    pub fn vault_order(&self) -> &VaultOrderIndex {
        &self.order
    }

    /// Resolve the item a reference points at.
    pub async fn find_item(&self, name: &str) -> Result<Item, ResolveError> {
        ItemResolver::new(self.client.as_ref(), &self.order)
            .resolve(name)
            .await
    }

    /// A single value: a field (default `password`) or a document file.
    pub async fn get_secret(
        &self,
        reference: &SecretReference,
    ) -> Result<SecretValue, ResolveError> {
        let item = self.find_item(&reference.key).await?;
        ValueExtractor::new(self.client.as_ref())
            .get_single_value(&item, &reference.property)
            .await
    }

    /// Every field (or every file, for documents) of the referenced item.
    ///
    /// `reference.property` is ignored.
    pub async fn get_secret_map(
        &self,
        reference: &SecretReference,
    ) -> Result<HashMap<String, SecretValue>, ResolveError> {
        let item = self.find_item(&reference.key).await?;
        ValueExtractor::new(self.client.as_ref())
            .get_value_map(&item)
            .await
    }

    /// Syncing many items into one secret is not implemented.
    pub async fn get_all_secrets(
        &self,
        _reference: &SecretReference,
    ) -> Result<HashMap<String, SecretValue>, ResolveError> {
        Err(ResolveError::Unsupported("get_all_secrets"))
    }

    /// List every configured vault once; the first failure is returned.
    pub async fn validate(&self) -> Result<(), ResolveError> {
        for vault_name in self.order.ordered_names() {
            let items = self
                .client
                .list_items(vault_name)
                .await
                .map_err(ResolveError::backend(BackendStage::ItemListing))?;
            debug!(vault = vault_name, items = items.len(), "vault reachable");
        }
        Ok(())
    }
}
