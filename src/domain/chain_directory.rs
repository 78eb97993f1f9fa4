//! Read-only chain identifier → display name lookup.

use std::collections::HashMap;

/// Snapshot of the chain directory, refreshed by a separate subsystem.
///
/// The pipeline only ever reads it. Unknown identifiers resolve to a short
/// id-derived placeholder so no message is dropped for lack of a name.
#[derive(Debug, Clone, Default)]
pub struct ChainDirectory {
    names: HashMap<String, String>,
}

impl ChainDirectory {
    /// Builds a directory from `(chain_id, chain_name)` pairs.
    #[must_use]
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        Self {
            names: pairs.into_iter().collect(),
        }
    }

    /// Resolves a chain identifier to its display name.
    ///
    /// Falls back to `chain-<first 8 chars of id>` for unknown identifiers.
    #[must_use]
    pub fn resolve(&self, chain_id: &str) -> String {
        self.names.get(chain_id).cloned().unwrap_or_else(|| {
            let short: String = chain_id.chars().take(8).collect();
            format!("chain-{short}")
        })
    }

    /// Number of known chains.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the directory has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
