//! Record builders and canned scenarios shared by the lineage test suites.

use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use lineage_core::models::{ClauseRecord, DocumentRecord, PartyPair};

/// Midnight UTC on the given day.
///
/// # Panics
/// On an invalid calendar date.
pub fn date(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0)
        .single()
        .unwrap_or_else(|| panic!("invalid date {year}-{month:02}-{day:02}"))
}

/// Builder for a [`DocumentRecord`]. The file hash comes from `content`.
#[derive(Debug, Clone)]
pub struct DocumentBuilder {
    record: DocumentRecord,
}

impl DocumentBuilder {
    pub fn new(content: &str) -> Self {
        Self {
            record: DocumentRecord::from_bytes(content.as_bytes()),
        }
    }

    pub fn doc_type(mut self, doc_type: &str) -> Self {
        self.record.doc_type = Some(doc_type.to_string());
        self
    }

    pub fn effective(mut self, at: DateTime<Utc>) -> Self {
        self.record.effective_ts = Some(at);
        self
    }

    pub fn term(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.record.term_start = Some(start);
        self.record.term_end = Some(end);
        self
    }

    pub fn parties(mut self, a: &str, b: &str) -> Self {
        self.record.parties = Some(PartyPair::new(a, b));
        self
    }

    pub fn confidence(mut self, confidence: f64) -> Self {
        self.record.metadata_confidence = Some(confidence);
        self
    }

    pub fn build(self) -> DocumentRecord {
        self.record
    }
}

/// Builder for a [`ClauseRecord`].
#[derive(Debug, Clone)]
pub struct ClauseBuilder {
    record: ClauseRecord,
}

impl ClauseBuilder {
    pub fn new(section: &str, text: &str) -> Self {
        Self {
            record: ClauseRecord {
                page: 1,
                span_start: 0,
                span_end: text.len() as u64,
                canonical_section_id: section.to_string(),
                text: text.to_string(),
                confidence: 0.9,
                ..ClauseRecord::default()
            },
        }
    }

    pub fn action(mut self, action: &str) -> Self {
        self.record.change_action = Some(action.to_string());
        self
    }

    /// Place the clause at `page`, starting at `start`.
    pub fn at(mut self, page: u32, start: u64) -> Self {
        let len = self.record.span_end - self.record.span_start;
        self.record.page = page;
        self.record.span_start = start;
        self.record.span_end = start + len;
        self
    }

    pub fn title(mut self, title: &str) -> Self {
        self.record.section_title = Some(title.to_string());
        self
    }

    pub fn effective(mut self, at: DateTime<Utc>) -> Self {
        self.record.effective_ts = Some(at);
        self
    }

    pub fn modifies(mut self, section: &str) -> Self {
        self.record.modifies_section_id = Some(section.to_string());
        self
    }

    pub fn facts(mut self, facts: Value) -> Self {
        self.record.extracted_facts = Some(facts);
        self
    }

    pub fn confidence(mut self, confidence: f64) -> Self {
        self.record.confidence = confidence;
        self
    }

    pub fn build(self) -> ClauseRecord {
        self.record
    }
}

pub const ACME: &str = "Acme Corp.";
pub const WIDGET: &str = "Widget LLC";

pub const MASTER_CAP: &str = "Liability is capped at $500,000.";
pub const AMENDED_CAP: &str = "Liability is capped at $1,000,000.";

/// One document of a canned scenario with its clauses.
#[derive(Debug, Clone)]
pub struct ScenarioDocument {
    pub record: DocumentRecord,
    pub clauses: Vec<ClauseRecord>,
}

/// The master agreement: section 5.3 caps liability at $500,000.
pub fn acme_master() -> ScenarioDocument {
    ScenarioDocument {
        record: DocumentBuilder::new("acme-widget master services agreement")
            .doc_type("master")
            .effective(date(2024, 1, 1))
            .parties(ACME, WIDGET)
            .confidence(0.95)
            .build(),
        clauses: vec![
            ClauseBuilder::new("5.3", MASTER_CAP)
                .action("NO_CHANGE")
                .title("Limitation of Liability")
                .at(4, 1200)
                .facts(serde_json::json!({"cap_amount": 500000, "currency": "USD"}))
                .build(),
            ClauseBuilder::new("12.1", "Either party may terminate on 90 days notice.")
                .title("Termination")
                .at(9, 300)
                .build(),
        ],
    }
}

/// The amendment: section 5.3 is replaced with a $1,000,000 cap.
pub fn acme_amendment() -> ScenarioDocument {
    ScenarioDocument {
        record: DocumentBuilder::new("acme-widget amendment no. 1")
            .doc_type("Amendment")
            .effective(date(2024, 6, 1))
            .parties("ACME, Inc.", "Widget")
            .confidence(0.9)
            .build(),
        clauses: vec![ClauseBuilder::new("5.3", AMENDED_CAP)
            .action("replace")
            .title("Limitation of Liability")
            .modifies("5.3")
            .facts(serde_json::json!({"schema_version": 1, "facts": {"cap_amount": 1000000, "currency": "USD"}}))
            .build()],
    }
}

/// Master then amendment, in arrival order.
pub fn acme_widget_scenario() -> Vec<ScenarioDocument> {
    vec![acme_master(), acme_amendment()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_documents_have_distinct_hashes() {
        let docs = acme_widget_scenario();
        assert_ne!(docs[0].record.file_bytes_hash, docs[1].record.file_bytes_hash);
    }

    #[test]
    fn clause_builder_keeps_span_length_when_moved() {
        let clause = ClauseBuilder::new("1", "abcd").at(3, 100).build();
        assert_eq!((clause.page, clause.span_start, clause.span_end), (3, 100, 104));
    }
}
