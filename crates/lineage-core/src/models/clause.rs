//! Clause nodes: immutable facts, one per extracted clause span.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::facts::ExtractedFacts;
use crate::errors::{LineageError, LineageResult};
use crate::hashing;

/// How a clause relates to the prior text of its section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeAction {
    Replace,
    Append,
    AddNew,
    Delete,
    NoChange,
}

impl ChangeAction {
    pub const ALL: [ChangeAction; 5] = [
        Self::Replace,
        Self::Append,
        Self::AddNew,
        Self::Delete,
        Self::NoChange,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Replace => "REPLACE",
            Self::Append => "APPEND",
            Self::AddNew => "ADD_NEW",
            Self::Delete => "DELETE",
            Self::NoChange => "NO_CHANGE",
        }
    }

    /// Case-insensitive parse; unknown values become `None` (treated as `NO_CHANGE`).
    pub fn parse_lenient(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        match trimmed.parse() {
            Ok(action) => Some(action),
            Err(_) => {
                tracing::warn!(value = %trimmed, "unknown change_action, treating as NO_CHANGE");
                None
            }
        }
    }
}

impl fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChangeAction {
    type Err = LineageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_uppercase();
        Self::ALL
            .into_iter()
            .find(|a| a.as_str() == upper)
            .ok_or_else(|| LineageError::InvalidEnum {
                field: "change_action",
                value: s.to_string(),
            })
    }
}

/// One extracted clause span. Never edited once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClauseNode {
    pub node_id: String,
    pub doc_id: String,
    pub family_id: String,
    pub canonical_section_id: String,
    pub section_title: Option<String>,
    pub referenced_section_id: Option<String>,
    pub modifies_section_id: Option<String>,
    pub change_action: Option<ChangeAction>,
    /// Date the fold orders and cuts off by: the clause's own date, or its
    /// document's date when the clause declared none.
    pub effective_ts: Option<DateTime<Utc>>,
    /// Date the clause itself declared. `None` means `effective_ts` follows
    /// the owning document.
    pub declared_effective_ts: Option<DateTime<Utc>>,
    pub page: u32,
    pub span_start: u64,
    pub span_end: u64,
    pub clause_text: String,
    pub extracted_facts: Option<ExtractedFacts>,
    /// Always within [0, 1].
    pub confidence: f64,
    pub created_at: DateTime<Utc>,
    /// Store-assigned arrival sequence; ignored on write.
    pub arrival_seq: u64,
}

impl ClauseNode {
    /// The action the fold applies; absent means `NO_CHANGE`.
    pub fn effective_action(&self) -> ChangeAction {
        self.change_action.unwrap_or(ChangeAction::NoChange)
    }

    /// True when `effective_ts` was taken from the owning document.
    pub fn inherits_document_date(&self) -> bool {
        self.declared_effective_ts.is_none()
    }

    /// Id recomputed from this node's provenance fields.
    pub fn expected_node_id(&self) -> String {
        hashing::node_id(
            &self.doc_id,
            self.page,
            self.span_start,
            self.span_end,
            &self.canonical_section_id,
        )
    }

    /// Fails with `IntegrityViolation` when `node_id` does not match the fields.
    pub fn verify_identity(&self) -> LineageResult<()> {
        let expected = self.expected_node_id();
        if expected != self.node_id {
            return Err(LineageError::IntegrityViolation(format!(
                "clause node {} does not match its content hash {expected}",
                self.node_id
            )));
        }
        Ok(())
    }
}

/// Clamp a confidence score into [0, 1]; NaN becomes 0.
pub fn clamp_confidence(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
