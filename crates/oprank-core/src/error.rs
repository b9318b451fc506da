//! Resolution and extraction errors.
//!
//! Every variant is terminal for the call that produced it. Ambiguity and
//! not-found are ordinary outcomes of a misconfigured store, so each carries
//! the names and counts needed to diagnose it without re-querying.

use std::fmt;

use crate::backend::BackendError;
use crate::order::VaultOrderIndex;

/// Which backend call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendStage {
    VaultLookup,
    ItemLookup,
    ItemFetch,
    FileFetch,
    ItemListing,
}

impl fmt::Display for BackendStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::VaultLookup => "finding 1Password Vault",
            Self::ItemLookup => "finding 1Password Item",
            Self::ItemFetch => "fetching 1Password Item",
            Self::FileFetch => "fetching 1Password File",
            Self::ItemListing => "listing 1Password Items",
        };
        f.write_str(s)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("error {stage}: {source}")]
    Backend {
        stage: BackendStage,
        #[source]
        source: BackendError,
    },

    #[error("expected one 1Password Vault matching '{name}', got {count}")]
    AmbiguousVault { name: String, count: usize },

    #[error("expected one 1Password Item matching '{name}', got {count}")]
    AmbiguousItem { name: String, count: usize },

    #[error("key not found in 1Password Vaults: {name} in: {vaults}")]
    NotFound {
        name: String,
        vaults: VaultOrderIndex,
    },

    #[error("error finding 1Password Document: '{title}', '{property}'")]
    DocumentNotFound { title: String, property: String },

    #[error("expected one 1Password ItemField matching '{label}' in '{title}', got {count}")]
    AmbiguousField {
        label: String,
        title: String,
        count: usize,
    },

    #[error("{0} is not supported by the 1Password provider")]
    Unsupported(&'static str),
}

impl ResolveError {
    pub(crate) fn backend(stage: BackendStage) -> impl FnOnce(BackendError) -> Self {
        move |source| Self::Backend { stage, source }
    }
}
