//! Extension content resolution configuration.

use serde::{Deserialize, Serialize};

/// Limits and caching for extension-owned file resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentConfig {
    /// Largest file the resolver will return, in bytes.
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: u64,
    /// Whether resolved content is cached (invalidated on lifecycle events).
    #[serde(default = "default_true")]
    pub cache_enabled: bool,
    /// Maximum number of cached files.
    #[serde(default = "default_cache_max_entries")]
    pub cache_max_entries: u64,
    /// Time-to-live of a cached file in seconds.
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_seconds: u64,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            max_file_bytes: default_max_file_bytes(),
            cache_enabled: true,
            cache_max_entries: default_cache_max_entries(),
            cache_ttl_seconds: default_cache_ttl(),
        }
    }
}

fn default_max_file_bytes() -> u64 {
    5 * 1024 * 1024
}

fn default_cache_max_entries() -> u64 {
    1024
}

fn default_cache_ttl() -> u64 {
    300
}

fn default_true() -> bool {
    true
}
