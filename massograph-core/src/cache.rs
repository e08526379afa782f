use crate::types::ResolvedCorpus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Version constants for cache invalidation
pub mod versions {
    pub const MASSOGRAPH_VERSION: &str = env!("CARGO_PKG_VERSION");
    pub const PROCESSING_VERSION: &str = "1.0.0";
}

/// Snapshot cache key (corpus + alias table + config → resolved corpus)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct SnapshotCacheKey {
    pub corpus_hash: String,
    pub alias_hash: String,
    pub config_hash: String,
    pub recognizer: String,
    pub massograph_version: String,
    pub processing_version: String,
}

impl SnapshotCacheKey {
    pub fn new(corpus_hash: String, alias_hash: String, config_hash: String, recognizer: &str) -> Self {
        Self {
            corpus_hash,
            alias_hash,
            config_hash,
            recognizer: recognizer.to_string(),
            massograph_version: versions::MASSOGRAPH_VERSION.to_string(),
            processing_version: versions::PROCESSING_VERSION.to_string(),
        }
    }

    /// Compute cache key hash for storage
    pub fn to_cache_hash(&self) -> String {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        for part in [
            &self.corpus_hash,
            &self.alias_hash,
            &self.config_hash,
            &self.recognizer,
            &self.massograph_version,
            &self.processing_version,
        ] {
            hasher.update(part.as_bytes());
            hasher.update([0u8]);
        }
        format!("{:x}", hasher.finalize())
    }
}

/// Cached resolution result with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotCacheValue {
    pub corpus: ResolvedCorpus,
    pub created_at: DateTime<Utc>,
    pub processing_time_ms: u64,
    pub cache_version: String,
}

impl SnapshotCacheValue {
    pub fn new(corpus: ResolvedCorpus, processing_time_ms: u64) -> Self {
        Self {
            corpus,
            created_at: Utc::now(),
            processing_time_ms,
            cache_version: versions::MASSOGRAPH_VERSION.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(corpus_hash: &str) -> SnapshotCacheKey {
        SnapshotCacheKey::new(corpus_hash.into(), "aliases".into(), "config".into(), "heuristic")
    }

    #[test]
    fn cache_hash_is_stable_and_input_sensitive() {
        assert_eq!(key("a").to_cache_hash(), key("a").to_cache_hash());
        assert_ne!(key("a").to_cache_hash(), key("b").to_cache_hash());
    }

    #[test]
    fn field_boundaries_matter() {
        let left = SnapshotCacheKey::new("ab".into(), "c".into(), "x".into(), "heuristic");
        let right = SnapshotCacheKey::new("a".into(), "bc".into(), "x".into(), "heuristic");
        assert_ne!(left.to_cache_hash(), right.to_cache_hash());
    }
}
