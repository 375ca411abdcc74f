pub mod cache_config;
pub mod ingestion_config;
pub mod query_config;
pub mod storage_config;

use serde::{Deserialize, Serialize};

pub use cache_config::CacheConfig;
pub use ingestion_config::IngestionConfig;
pub use query_config::QueryConfig;
pub use storage_config::StorageConfig;

use crate::errors::{LineageError, LineageResult};

/// Top-level configuration aggregating all subsystem configs.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LineageConfig {
    pub storage: StorageConfig,
    pub ingestion: IngestionConfig,
    pub query: QueryConfig,
    pub cache: CacheConfig,
}

impl LineageConfig {
    /// Load config from a TOML string, falling back to defaults for missing fields.
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }

    /// Reject values the engine cannot operate with.
    pub fn validate(&self) -> LineageResult<()> {
        let threshold = self.ingestion.metadata_confidence_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(LineageError::Config(format!(
                "ingestion.metadata_confidence_threshold must be within [0, 1], got {threshold}"
            )));
        }
        if self.query.semantic_prefix.trim().is_empty() {
            return Err(LineageError::Config(
                "query.semantic_prefix must not be empty".to_string(),
            ));
        }
        if self.cache.family_cache_capacity == 0 {
            return Err(LineageError::Config(
                "cache.family_cache_capacity must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
