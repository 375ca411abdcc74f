use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// All contracts between one unordered pair of normalized parties.
/// Created once; never mutated or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Family {
    pub family_id: String,
    pub family_keys_hash: String,
    /// Lexicographically smaller normalized name.
    pub party_a_norm: String,
    pub party_b_norm: String,
    pub created_at: DateTime<Utc>,
}
