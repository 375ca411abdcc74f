//! Input records handed over by the extraction and enrichment stages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::hashing;

/// The two contracting parties, in any order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyPair {
    pub party_a: String,
    pub party_b: String,
}

impl PartyPair {
    pub fn new(party_a: impl Into<String>, party_b: impl Into<String>) -> Self {
        Self {
            party_a: party_a.into(),
            party_b: party_b.into(),
        }
    }

    /// Both names present after trimming.
    pub fn is_complete(&self) -> bool {
        !self.party_a.trim().is_empty() && !self.party_b.trim().is_empty()
    }
}

/// Document-level metadata for one file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    /// `file_hash` of the raw bytes.
    pub file_bytes_hash: String,
    /// Raw classification; parsed leniently.
    pub doc_type: Option<String>,
    pub effective_ts: Option<DateTime<Utc>>,
    pub term_start: Option<DateTime<Utc>>,
    pub term_end: Option<DateTime<Utc>>,
    pub parties: Option<PartyPair>,
    pub metadata_confidence: Option<f64>,
}

impl DocumentRecord {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            file_bytes_hash: hashing::file_hash(bytes),
            ..Self::default()
        }
    }
}

/// One enriched clause span of the document being ingested.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClauseRecord {
    pub page: u32,
    pub span_start: u64,
    pub span_end: u64,
    pub canonical_section_id: String,
    pub section_title: Option<String>,
    /// Raw action; parsed leniently.
    pub change_action: Option<String>,
    pub referenced_section_id: Option<String>,
    pub modifies_section_id: Option<String>,
    /// Falls back to the document's effective date.
    pub effective_ts: Option<DateTime<Utc>>,
    pub text: String,
    /// Bare or versioned JSON object.
    pub extracted_facts: Option<serde_json::Value>,
    pub confidence: f64,
}
