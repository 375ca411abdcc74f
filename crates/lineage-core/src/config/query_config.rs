//! Query subsystem configuration.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Prefix of slug-style canonical section ids (`semantic:limitation_of_liability`).
    pub semantic_prefix: String,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            semantic_prefix: "semantic:".to_string(),
        }
    }
}
