//! Ingestion subsystem configuration.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestionConfig {
    /// Documents whose metadata confidence falls below this are flagged low quality.
    pub metadata_confidence_threshold: f64,
    /// Re-process a document even when its file hash is already stored.
    pub force_reingest: bool,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            metadata_confidence_threshold: 0.7,
            force_reingest: false,
        }
    }
}
