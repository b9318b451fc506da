//! Core of oprank: resolving secret references against ranked 1Password vaults.
//!
//! A reference names an item title and, optionally, a property. Resolution
//! walks the configured vaults in precedence order and stops at the first
//! vault holding exactly one item with that title. Extraction then reads
//! either a single field / file or a projection of all of them.
//!
//! Network access is abstracted behind [`backend::BackendClient`]; this
//! crate performs no I/O of its own.

pub mod backend;
pub mod config;
pub mod error;
pub mod extract;
pub mod order;
pub mod provider;
pub mod resolve;
pub mod secret;
pub mod types;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use backend::{BackendClient, BackendError, BackendFuture};
pub use error::{BackendStage, ResolveError};
pub use order::{VaultOrderIndex, VaultRank, VaultSpec};
pub use provider::OnePasswordProvider;
pub use secret::SecretValue;
pub use types::{Field, File, Item, ItemSummary, ItemVault, SecretReference, Vault};
