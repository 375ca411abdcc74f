//! Contract documents and their classification.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::records::PartyPair;
use crate::errors::LineageError;

/// Closed set of document classifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocType {
    Master,
    Amendment,
    Restatement,
    Sow,
    Addendum,
}

impl DocType {
    pub const ALL: [DocType; 5] = [
        Self::Master,
        Self::Amendment,
        Self::Restatement,
        Self::Sow,
        Self::Addendum,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Master => "master",
            Self::Amendment => "amendment",
            Self::Restatement => "restatement",
            Self::Sow => "sow",
            Self::Addendum => "addendum",
        }
    }

    /// Case-insensitive parse that maps unknown values to "unclassified".
    pub fn parse_lenient(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        match trimmed.parse() {
            Ok(doc_type) => Some(doc_type),
            Err(_) => {
                tracing::warn!(value = %trimmed, "unknown doc_type, storing as unclassified");
                None
            }
        }
    }
}

impl fmt::Display for DocType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocType {
    type Err = LineageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == lowered)
            .ok_or_else(|| LineageError::InvalidEnum {
                field: "doc_type",
                value: s.to_string(),
            })
    }
}

/// Extraction quality flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocQuality {
    #[default]
    Normal,
    Low,
}

impl DocQuality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Low => "low",
        }
    }

    /// `Low` when the metadata confidence is known and below `threshold`.
    pub fn from_confidence(confidence: Option<f64>, threshold: f64) -> Self {
        match confidence {
            Some(c) if c < threshold => Self::Low,
            _ => Self::Normal,
        }
    }
}

impl FromStr for DocQuality {
    type Err = LineageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "normal" => Ok(Self::Normal),
            "low" => Ok(Self::Low),
            other => Err(LineageError::InvalidEnum {
                field: "doc_quality",
                value: other.to_string(),
            }),
        }
    }
}

/// One ingested file. Updated in place as metadata resolves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractDocument {
    pub doc_id: String,
    pub file_hash: String,
    pub family_id: Option<String>,
    pub doc_type: Option<DocType>,
    pub effective_ts: Option<DateTime<Utc>>,
    pub term_start: Option<DateTime<Utc>>,
    pub term_end: Option<DateTime<Utc>>,
    /// Arrival rank within the family. Never renumbered.
    pub version_ingest: Option<u32>,
    /// Effective-date rank within the family. Recomputed on every insertion.
    pub version_timeline: Option<u32>,
    /// Normalized party names.
    pub parties: Option<PartyPair>,
    pub metadata_confidence: Option<f64>,
    pub quality: DocQuality,
    pub created_at: DateTime<Utc>,
    /// Store-assigned arrival sequence; ignored on write.
    pub arrival_seq: u64,
}

impl ContractDocument {
    pub fn is_restatement(&self) -> bool {
        self.doc_type == Some(DocType::Restatement)
    }
}
