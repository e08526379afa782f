use crate::alias::AliasTable;
use crate::cache::{SnapshotCacheKey, SnapshotCacheValue};
use anyhow::{anyhow, Result};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;

/// Storage abstraction for caching resolved corpora
pub trait SnapshotStorage {
    fn get_snapshot(&self, cache_key: &SnapshotCacheKey) -> Result<Option<SnapshotCacheValue>>;
    fn store_snapshot(&self, cache_key: &SnapshotCacheKey, cache_value: &SnapshotCacheValue) -> Result<()>;
}

/// File-based storage implementation using local cache directory
pub struct FileStorage {
    cache_dir: String,
}

impl FileStorage {
    pub fn new(cache_dir: &str) -> Result<Self> {
        fs::create_dir_all(format!("{cache_dir}/resolved"))?;

        Ok(Self {
            cache_dir: cache_dir.to_string(),
        })
    }

    fn snapshot_path(&self, cache_key: &SnapshotCacheKey) -> String {
        format!("{}/resolved/{}.json", self.cache_dir, cache_key.to_cache_hash())
    }
}

impl SnapshotStorage for FileStorage {
    fn get_snapshot(&self, cache_key: &SnapshotCacheKey) -> Result<Option<SnapshotCacheValue>> {
        let path = self.snapshot_path(cache_key);
        if Path::new(&path).exists() {
            let json_str = fs::read_to_string(path)?;
            let cache_value: SnapshotCacheValue = serde_json::from_str(&json_str)
                .map_err(|e| anyhow!("Failed to deserialize cached snapshot: {}", e))?;
            Ok(Some(cache_value))
        } else {
            Ok(None)
        }
    }

    fn store_snapshot(&self, cache_key: &SnapshotCacheKey, cache_value: &SnapshotCacheValue) -> Result<()> {
        let path = self.snapshot_path(cache_key);
        let json_str = serde_json::to_string(cache_value)
            .map_err(|e| anyhow!("Failed to serialize snapshot: {}", e))?;
        fs::write(path, json_str)?;
        Ok(())
    }
}

/// Hash of the raw corpus file
pub fn calculate_corpus_hash(corpus_bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(corpus_bytes.len().to_le_bytes());
    hasher.update(corpus_bytes);
    format!("{:x}", hasher.finalize())
}

/// Hash of the alias table contents, independent of insertion order
pub fn calculate_alias_hash(aliases: &AliasTable) -> String {
    let mut hasher = Sha256::new();
    for (url, title) in aliases.sorted_entries() {
        hasher.update(url.as_bytes());
        hasher.update([0u8]);
        hasher.update(title.as_bytes());
        hasher.update([b'\n']);
    }
    format!("{:x}", hasher.finalize())
}

/// Calculate hash for configuration data
pub fn calculate_config_hash<T: serde::Serialize>(config: &T) -> Result<String> {
    let config_json = serde_json::to_string(config)
        .map_err(|e| anyhow!("Failed to serialize config for hashing: {}", e))?;

    let mut hasher = Sha256::new();
    hasher.update(config_json.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

/// No-op storage implementation that disables all caching
pub struct NoOpStorage;

impl Default for NoOpStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl NoOpStorage {
    pub fn new() -> Self {
        Self
    }
}

impl SnapshotStorage for NoOpStorage {
    fn get_snapshot(&self, _cache_key: &SnapshotCacheKey) -> Result<Option<SnapshotCacheValue>> {
        Ok(None) // Always cache miss
    }

    fn store_snapshot(&self, _cache_key: &SnapshotCacheKey, _cache_value: &SnapshotCacheValue) -> Result<()> {
        Ok(())
    }
}
