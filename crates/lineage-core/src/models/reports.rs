//! Outcome summaries of write-side operations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::document::{DocQuality, DocType};

/// Both ranks of one document after assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionStamp {
    pub version_ingest: u32,
    pub version_timeline: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SectionKey {
    pub family_id: String,
    pub canonical_section_id: String,
}

impl SectionKey {
    pub fn new(family_id: impl Into<String>, canonical_section_id: impl Into<String>) -> Self {
        Self {
            family_id: family_id.into(),
            canonical_section_id: canonical_section_id.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionFailure {
    pub key: SectionKey,
    pub error: String,
}

/// Per-section outcome of a materialization batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterializationReport {
    /// Sections whose row was written or left unchanged.
    pub materialized: Vec<SectionKey>,
    /// Sections with no remaining nodes whose row was dropped.
    pub removed: Vec<SectionKey>,
    pub failed: Vec<SectionFailure>,
}

impl MaterializationReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn total(&self) -> usize {
        self.materialized.len() + self.removed.len() + self.failed.len()
    }

    pub fn merge(&mut self, other: MaterializationReport) {
        self.materialized.extend(other.materialized);
        self.removed.extend(other.removed);
        self.failed.extend(other.failed);
    }
}

/// Result of ingesting one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestionReport {
    pub doc_id: String,
    pub file_hash: String,
    pub family_id: Option<String>,
    pub doc_type: Option<DocType>,
    pub quality: DocQuality,
    pub version_ingest: Option<u32>,
    pub version_timeline: Option<u32>,
    pub clauses_stored: usize,
    pub sections: MaterializationReport,
    /// The file was already ingested and nothing was written.
    pub skipped: bool,
}

/// Result of correcting a document's effective date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectionReport {
    pub doc_id: String,
    pub family_id: Option<String>,
    pub previous_effective_ts: Option<DateTime<Utc>>,
    pub effective_ts: Option<DateTime<Utc>>,
    /// `None` for unversioned documents.
    pub versions: Option<VersionStamp>,
    pub sections: MaterializationReport,
}
