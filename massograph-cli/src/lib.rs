// All core functionality is in massograph-core
// This CLI acts as a thin wrapper around the core library

// CLI-specific modules
pub mod fetcher;

use std::path::PathBuf;

// Re-export core types for convenience
pub use massograph_core::*;

// Re-export CLI utilities
pub use fetcher::{DownloadLog, FetchReport, FetchTargets, FetchedDocument, Fetcher, ScraperSet};

/// Snapshot cache location (~/.cache/massograph on Linux), falling back to
/// `./cache` when the platform has no cache directory.
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .map(|dir| dir.join("massograph"))
        .unwrap_or_else(|| PathBuf::from("cache"))
}
