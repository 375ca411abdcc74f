use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Materialized current state of one (family, section) pair.
///
/// A rebuildable cache over the clause nodes. A missing row means no facts
/// exist for the key; a deleted section keeps its row with no text and no node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FamilySectionCurrent {
    pub family_id: String,
    pub canonical_section_id: String,
    pub current_node_id: Option<String>,
    pub current_effective_ts: Option<DateTime<Utc>>,
    pub composed_text: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl FamilySectionCurrent {
    pub fn is_deleted(&self) -> bool {
        self.composed_text.is_none() && self.current_node_id.is_none()
    }

    /// True when both rows carry the same folded content, ignoring `updated_at`.
    pub fn same_content(&self, other: &Self) -> bool {
        self.family_id == other.family_id
            && self.canonical_section_id == other.canonical_section_id
            && self.current_node_id == other.current_node_id
            && self.current_effective_ts == other.current_effective_ts
            && self.composed_text == other.composed_text
    }
}
