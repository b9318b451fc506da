//! Vault precedence ordering.
//!
//! Each configured vault name carries an integer rank; resolution visits
//! vaults in ascending rank. Ties are broken by vault name so the walk is
//! identical on every run.

use std::collections::HashMap;
use std::fmt;

/// Precedence rank of a vault. Lower ranks are consulted first.
pub type VaultRank = i64;

/// A configured vault name and its rank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultSpec {
    pub name: String,
    pub rank: VaultRank,
}

impl fmt::Display for VaultSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.rank)
    }
}

/// Vault names sorted by ascending rank, then by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VaultOrderIndex {
    specs: Vec<VaultSpec>,
}

impl VaultOrderIndex {
    /// Build the index from a name-to-rank mapping.
    pub fn new(vaults: &HashMap<String, VaultRank>) -> Self {
        let mut specs: Vec<VaultSpec> = vaults
            .iter()
            .map(|(name, rank)| VaultSpec {
                name: name.clone(),
                rank: *rank,
            })
            .collect();
        specs.sort_by(|a, b| a.rank.cmp(&b.rank).then_with(|| a.name.cmp(&b.name)));
        Self { specs }
    }

    /// Vault names in the order resolution visits them.
    pub fn ordered_names(&self) -> impl Iterator<Item = &str> {
        self.specs.iter().map(|spec| spec.name.as_str())
    }

    /// The full specs in visiting order.
    pub fn specs(&self) -> &[VaultSpec] {
        &self.specs
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, VaultRank)> for VaultOrderIndex {
    /// Later entries for a repeated name replace earlier ones.
    fn from_iter<I: IntoIterator<Item = (K, VaultRank)>>(iter: I) -> Self {
        let ranks: HashMap<String, VaultRank> =
            iter.into_iter().map(|(k, v)| (k.into(), v)).collect();
        Self::new(&ranks)
    }
}

impl fmt::Display for VaultOrderIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, spec) in self.specs.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{spec}")?;
        }
        write!(f, "}}")
    }
}

/// Vault names from `vaults` in ascending rank order.
pub fn ordered_names(vaults: &HashMap<String, VaultRank>) -> Vec<String> {
    VaultOrderIndex::new(vaults)
        .ordered_names()
        .map(str::to_owned)
        .collect()
}
