//! Content hashing for critical inline scripts.

use sha2::{Digest, Sha256};
use std::collections::HashSet;

/// Hash of a critical script's text, used as its identity across pages.
pub fn script_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

/// Registry of critical scripts already executed in this session.
///
/// Write-once per hash. Nothing removes an entry short of a full engine reset.
#[derive(Debug, Clone, Default)]
pub struct ExecutedScripts {
    hashes: HashSet<String>,
}

impl ExecutedScripts {
    /// Record a hash. Returns `false` if it was already present.
    pub fn record(&mut self, hash: impl Into<String>) -> bool {
        self.hashes.insert(hash.into())
    }

    pub fn contains(&self, hash: &str) -> bool {
        self.hashes.contains(hash)
    }

    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }

    pub(crate) fn clear(&mut self) {
        self.hashes.clear();
    }
}
