//! In-process cache configuration.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of family-key → family-id entries kept in memory.
    pub family_cache_capacity: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            family_cache_capacity: 1024,
        }
    }
}
