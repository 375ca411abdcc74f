//! Temporal query inputs and results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::clause::ChangeAction;
use super::document::DocType;
use super::facts::ExtractedFacts;

/// How a query names its family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FamilySelector {
    Id(String),
    /// Party names in any order; resolved read-only.
    Parties(String, String),
}

impl FamilySelector {
    pub fn parties(a: impl Into<String>, b: impl Into<String>) -> Self {
        Self::Parties(a.into(), b.into())
    }

    pub fn describe(&self) -> String {
        match self {
            Self::Id(id) => id.clone(),
            Self::Parties(a, b) => format!("{a} / {b}"),
        }
    }
}

/// Which resolution step produced a section id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionMatch {
    Exact,
    Semantic,
    Substring,
    /// Nothing matched; the query is echoed back.
    Unresolved,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedSection {
    pub query: String,
    pub canonical_section_id: String,
    pub matched: SectionMatch,
}

/// Materialized current state of a section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentSection {
    pub family_id: String,
    pub section: ResolvedSection,
    pub composed_text: Option<String>,
    pub current_node_id: Option<String>,
    pub current_effective_ts: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

/// One clause node in a section's timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub node_id: String,
    pub doc_id: String,
    /// Owning document's `version_timeline`.
    pub doc_version: Option<u32>,
    pub doc_type: Option<DocType>,
    pub change_action: Option<ChangeAction>,
    pub effective_ts: Option<DateTime<Utc>>,
    pub clause_text: String,
    pub extracted_facts: Option<ExtractedFacts>,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionHistory {
    pub family_id: String,
    pub section: ResolvedSection,
    pub entries: Vec<HistoryEntry>,
}

impl SectionHistory {
    pub fn total_versions(&self) -> usize {
        self.entries.len()
    }
}

/// One clause a document contributed to a section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClauseChange {
    pub node_id: String,
    pub change_action: Option<ChangeAction>,
    pub clause_text: String,
    pub modifies_section_id: Option<String>,
    pub referenced_section_id: Option<String>,
    pub effective_ts: Option<DateTime<Utc>>,
    pub extracted_facts: Option<ExtractedFacts>,
    pub confidence: f64,
}

/// What one timeline version changed in a section. `changes` may be empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionChanges {
    pub family_id: String,
    pub section: ResolvedSection,
    pub doc_version: u32,
    pub doc_id: String,
    pub doc_type: Option<DocType>,
    pub changes: Vec<ClauseChange>,
}

impl VersionChanges {
    pub fn touches_section(&self) -> bool {
        !self.changes.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SectionStatus {
    Active,
    Deleted,
}

/// Section state replayed up to a cutoff date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AsOfSection {
    pub family_id: String,
    pub section: ResolvedSection,
    pub as_of: DateTime<Utc>,
    pub status: SectionStatus,
    pub composed_text: Option<String>,
    pub current_node_id: Option<String>,
    pub effective_ts: Option<DateTime<Utc>>,
}
