//! Storage subsystem configuration.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database file. `None` opens an in-memory store.
    pub db_path: Option<String>,
    /// Number of read-only connections next to the single writer.
    pub read_pool_size: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            read_pool_size: 2,
        }
    }
}
