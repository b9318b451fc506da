//! Item resolution across ranked vaults.
//!
//! Vaults are visited in precedence order. The first vault holding exactly
//! one item with the requested title wins, and later vaults are never
//! consulted. Ambiguity is fatal at every stage: a vault name matching
//! several vaults, or several same-titled items inside one vault, stops the
//! walk instead of being skipped. Duplicate titles *across* vaults are the
//! only collisions settled by precedence.

use tracing::{debug, info, warn};

use crate::backend::BackendClient;
use crate::error::{BackendStage, ResolveError};
use crate::order::VaultOrderIndex;
use crate::types::Item;

/// Finds the authoritative item for a title.
///
/// Holds no state between calls; each resolution re-queries the backend.
pub struct ItemResolver<'a> {
    client: &'a dyn BackendClient,
    order: &'a VaultOrderIndex,
}

impl<'a> ItemResolver<'a> {
    pub fn new(client: &'a dyn BackendClient, order: &'a VaultOrderIndex) -> Self {
        Self { client, order }
    }

    /// Resolve `name` to a fully populated item.
    pub async fn resolve(&self, name: &str) -> Result<Item, ResolveError> {
        for vault_name in self.order.ordered_names() {
            debug!(vault = vault_name, item = name, "looking up vault");
            let vaults = self
                .client
                .find_vaults_by_name(vault_name)
                .await
                .map_err(ResolveError::backend(BackendStage::VaultLookup))?;

            let [vault] = vaults.as_slice() else {
                warn!(vault = vault_name, count = vaults.len(), "vault name is ambiguous");
                return Err(ResolveError::AmbiguousVault {
                    name: vault_name.to_owned(),
                    count: vaults.len(),
                });
            };

            let items = self
                .client
                .find_items_by_title(name, &vault.id)
                .await
                .map_err(ResolveError::backend(BackendStage::ItemLookup))?;

            match items.as_slice() {
                [] => {
                    debug!(vault = vault_name, item = name, "no match, trying next vault");
                }
                [summary] => {
                    info!(vault = vault_name, item = name, "resolved item");
                    return self
                        .client
                        .get_item(&summary.id, &summary.vault.id)
                        .await
                        .map_err(ResolveError::backend(BackendStage::ItemFetch));
                }
                _ => {
                    warn!(vault = vault_name, item = name, count = items.len(), "item title is ambiguous");
                    return Err(ResolveError::AmbiguousItem {
                        name: name.to_owned(),
                        count: items.len(),
                    });
                }
            }
        }

        Err(ResolveError::NotFound {
            name: name.to_owned(),
            vaults: self.order.clone(),
        })
    }
}
