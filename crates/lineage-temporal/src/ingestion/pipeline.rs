//! Document ingestion: store a document and its clauses, rank it within its
//! family and refold the sections it touched.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use lineage_core::errors::{LineageError, LineageResult, RecoveryAction};
use lineage_core::hashing;
use lineage_core::models::{
    clamp_confidence, ChangeAction, ClauseNode, ClauseRecord, ContractDocument, DocQuality,
    DocType, DocumentRecord, FactsUpcasterRegistry, IngestionReport, MaterializationReport,
    PartyPair,
};
use lineage_core::normalize::normalize_party_name;
use lineage_core::traits::{LineageStorage, LineageWriter};

use crate::engine::LineageEngine;
use crate::supersession::materialize::materialize_sections;
use crate::versioning::assign::{assign_versions, rerank_family};

struct Stored {
    document: ContractDocument,
    clauses_stored: usize,
    sections: MaterializationReport,
}

fn validate(record: &DocumentRecord, clauses: &[ClauseRecord]) -> LineageResult<()> {
    if record.file_bytes_hash.trim().is_empty() {
        return Err(LineageError::InvalidInput(
            "document record has no file hash".to_string(),
        ));
    }
    for clause in clauses {
        if clause.canonical_section_id.trim().is_empty() {
            return Err(LineageError::InvalidInput(format!(
                "clause on page {} at {}..{} has no canonical section id",
                clause.page, clause.span_start, clause.span_end
            )));
        }
        if clause.span_end < clause.span_start {
            return Err(LineageError::InvalidInput(format!(
                "clause {} has span end {} before start {}",
                clause.canonical_section_id, clause.span_end, clause.span_start
            )));
        }
    }
    Ok(())
}

/// Normalized party names, or `None` when either side is missing.
pub fn normalized_parties(parties: Option<&PartyPair>) -> Option<PartyPair> {
    let parties = parties.filter(|p| p.is_complete())?;
    let normalized = PartyPair::new(
        normalize_party_name(&parties.party_a),
        normalize_party_name(&parties.party_b),
    );
    normalized.is_complete().then_some(normalized)
}

/// Build the clause node for one record of document `doc_id`.
pub fn build_clause_node(
    record: ClauseRecord,
    doc_id: &str,
    family_id: &str,
    document_effective_ts: Option<DateTime<Utc>>,
    upcasters: &FactsUpcasterRegistry,
    now: DateTime<Utc>,
) -> ClauseNode {
    let section = record.canonical_section_id.trim().to_string();
    let extracted_facts = record
        .extracted_facts
        .and_then(|value| match upcasters.decode(value) {
            Ok(facts) => Some(facts),
            Err(e) => {
                warn!(doc_id, section = %section, error = %e, "dropping unreadable extracted facts");
                None
            }
        });

    ClauseNode {
        node_id: hashing::node_id(
            doc_id,
            record.page,
            record.span_start,
            record.span_end,
            &section,
        ),
        doc_id: doc_id.to_string(),
        family_id: family_id.to_string(),
        canonical_section_id: section,
        section_title: record.section_title,
        referenced_section_id: record.referenced_section_id,
        modifies_section_id: record.modifies_section_id,
        change_action: record
            .change_action
            .as_deref()
            .and_then(ChangeAction::parse_lenient),
        effective_ts: record.effective_ts.or(document_effective_ts),
        declared_effective_ts: record.effective_ts,
        page: record.page,
        span_start: record.span_start,
        span_end: record.span_end,
        clause_text: record.text,
        extracted_facts,
        confidence: clamp_confidence(record.confidence),
        created_at: now,
        arrival_seq: 0,
    }
}

/// Attempts at one ingestion when a concurrent writer moved the document.
const MAX_ATTEMPTS: u32 = 3;

enum Outcome {
    Stored(Stored),
    /// Another ingestion stored the file first.
    AlreadyIngested(ContractDocument),
}

fn skipped_report(existing: &ContractDocument) -> IngestionReport {
    IngestionReport {
        doc_id: existing.doc_id.clone(),
        file_hash: existing.file_hash.clone(),
        family_id: existing.family_id.clone(),
        doc_type: existing.doc_type,
        quality: existing.quality,
        version_ingest: existing.version_ingest,
        version_timeline: existing.version_timeline,
        clauses_stored: 0,
        sections: MaterializationReport::default(),
        skipped: true,
    }
}

fn store<W: LineageWriter + ?Sized>(
    writer: &mut W,
    document: &ContractDocument,
    previous_family: Option<&str>,
    nodes: &[ClauseNode],
    now: DateTime<Utc>,
) -> LineageResult<Stored> {
    let mut stored = writer.upsert_document(document)?;
    let Some(family_id) = document.family_id.as_deref() else {
        return Ok(Stored {
            document: stored,
            clauses_stored: 0,
            sections: MaterializationReport::default(),
        });
    };

    let stamp = assign_versions(writer, &document.doc_id, family_id, document.effective_ts)?;
    stored.version_ingest = Some(stamp.version_ingest);
    stored.version_timeline = Some(stamp.version_timeline);

    let left_family = previous_family.filter(|previous| *previous != family_id);
    if let Some(previous) = left_family {
        let moved = writer.move_document_nodes(&document.doc_id, family_id)?;
        info!(
            doc_id = %document.doc_id,
            from = previous,
            to = family_id,
            moved,
            "document changed family"
        );
    }

    let mut inserted = 0;
    for node in nodes {
        if writer.upsert_clause_node(node)? {
            inserted += 1;
        }
    }
    let redated = writer.set_inherited_effective_ts(&document.doc_id, document.effective_ts)?;
    debug!(
        doc_id = %document.doc_id,
        inserted,
        refreshed = nodes.len() - inserted,
        redated,
        "stored clause nodes"
    );

    let mut sections: BTreeSet<String> = nodes
        .iter()
        .map(|n| n.canonical_section_id.clone())
        .collect();
    if previous_family.is_some() {
        sections.extend(writer.section_ids_for_document(&document.doc_id)?);
    }
    let sections: Vec<String> = sections.into_iter().collect();
    let mut report = materialize_sections(writer, family_id, &sections, now)?;

    if let Some(previous) = left_family {
        rerank_family(writer, previous)?;
        report.merge(materialize_sections(writer, previous, &sections, now)?);
    }

    Ok(Stored {
        document: stored,
        clauses_stored: nodes.len(),
        sections: report,
    })
}

/// Ingest one document and its clauses.
///
/// A file whose hash is already stored is skipped unless
/// `ingestion.force_reingest` is set. Documents without both parties are
/// stored unversioned and their clauses are dropped; on a forced re-ingest
/// they keep the family they already had.
///
/// A forced re-ingest whose parties resolve to a different family moves
/// the document and its clause nodes there. Both families are re-ranked
/// and refolded in the same transaction.
pub fn ingest_document<S: LineageStorage>(
    engine: &LineageEngine<S>,
    record: DocumentRecord,
    clauses: Vec<ClauseRecord>,
) -> LineageResult<IngestionReport> {
    validate(&record, &clauses)?;
    let file_hash = record.file_bytes_hash.trim().to_string();
    let doc_id = hashing::doc_id(&file_hash);
    let force = engine.config.ingestion.force_reingest;

    let existing = engine
        .storage
        .read(|r| r.find_document_by_file_hash(&file_hash))?;
    if let Some(existing) = existing.as_ref().filter(|_| !force) {
        warn!(doc_id = %existing.doc_id, "document already ingested, skipping");
        return Ok(skipped_report(existing));
    }

    let parties = normalized_parties(record.parties.as_ref());
    let target_family = match &parties {
        Some(p) => Some(engine.match_or_create_family(&p.party_a, &p.party_b)?),
        None => None,
    };

    let mut attempt = 1;
    let outcome = loop {
        let previous_family = engine
            .storage
            .read(|r| r.get_document(&doc_id))?
            .and_then(|d| d.family_id);
        let locked: Vec<&str> = target_family
            .iter()
            .chain(previous_family.iter())
            .map(String::as_str)
            .collect();

        let result = engine.with_families_write(&locked, |w| {
            let current = w.get_document(&doc_id)?;
            if let Some(current) = current.as_ref().filter(|_| !force) {
                return Ok(Outcome::AlreadyIngested(current.clone()));
            }
            let current_family = current.as_ref().and_then(|d| d.family_id.clone());
            if current_family != previous_family {
                return Err(LineageError::ConflictRace {
                    entity: "contract_document",
                    key: doc_id.clone(),
                });
            }

            let family_id = target_family.clone().or_else(|| current_family.clone());
            if family_id.is_none() {
                warn!(doc_id = %doc_id, "document has no resolvable parties, storing unversioned");
            }
            let same_family = family_id.is_some() && family_id == current_family;
            let kept = current.as_ref().filter(|_| same_family);

            let now = Utc::now();
            let document = ContractDocument {
                doc_id: doc_id.clone(),
                file_hash: file_hash.clone(),
                family_id: family_id.clone(),
                doc_type: record.doc_type.as_deref().and_then(DocType::parse_lenient),
                effective_ts: record.effective_ts,
                term_start: record.term_start,
                term_end: record.term_end,
                version_ingest: kept.and_then(|d| d.version_ingest),
                version_timeline: kept.and_then(|d| d.version_timeline),
                parties: parties
                    .clone()
                    .or_else(|| current.as_ref().and_then(|d| d.parties.clone())),
                metadata_confidence: record.metadata_confidence,
                quality: DocQuality::from_confidence(
                    record.metadata_confidence,
                    engine.config.ingestion.metadata_confidence_threshold,
                ),
                created_at: now,
                arrival_seq: 0,
            };

            let nodes: Vec<ClauseNode> = match &family_id {
                Some(family_id) => clauses
                    .iter()
                    .cloned()
                    .map(|c| {
                        build_clause_node(
                            c,
                            &doc_id,
                            family_id,
                            document.effective_ts,
                            &engine.upcasters,
                            now,
                        )
                    })
                    .collect(),
                None => Vec::new(),
            };

            store(w, &document, current_family.as_deref(), &nodes, now).map(Outcome::Stored)
        });

        match result {
            Err(e)
                if attempt < MAX_ATTEMPTS
                    && RecoveryAction::for_error(&e) == RecoveryAction::Retry =>
            {
                debug!(doc_id = %doc_id, attempt, error = %e, "retrying ingestion");
                attempt += 1;
            }
            other => break other?,
        }
    };

    let stored = match outcome {
        Outcome::Stored(stored) => stored,
        Outcome::AlreadyIngested(existing) => {
            warn!(doc_id = %existing.doc_id, "document ingested concurrently, skipping");
            return Ok(skipped_report(&existing));
        }
    };

    if !stored.sections.is_clean() {
        warn!(
            doc_id = %doc_id,
            failed = stored.sections.failed.len(),
            "some sections failed to materialize"
        );
    }
    info!(
        doc_id = %doc_id,
        family_id = ?stored.document.family_id,
        doc_type = ?stored.document.doc_type,
        version_ingest = ?stored.document.version_ingest,
        version_timeline = ?stored.document.version_timeline,
        clauses = stored.clauses_stored,
        sections = stored.sections.total(),
        "ingested document"
    );

    Ok(IngestionReport {
        doc_id,
        file_hash,
        family_id: stored.document.family_id,
        doc_type: stored.document.doc_type,
        quality: stored.document.quality,
        version_ingest: stored.document.version_ingest,
        version_timeline: stored.document.version_timeline,
        clauses_stored: stored.clauses_stored,
        sections: stored.sections,
        skipped: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parties_are_normalized_before_matching() {
        let pair = normalized_parties(Some(&PartyPair::new("Acme Corp.", "Widget, LLC")));
        assert_eq!(pair, Some(PartyPair::new("acme", "widget")));
    }

    #[test]
    fn incomplete_parties_yield_none() {
        assert_eq!(normalized_parties(None), None);
        assert_eq!(normalized_parties(Some(&PartyPair::new("Acme", " "))), None);
        assert_eq!(normalized_parties(Some(&PartyPair::new("Acme", "Inc."))), None);
    }

    #[test]
    fn clause_node_inherits_document_date_and_clamps_confidence() {
        let doc_date = Utc::now();
        let record = ClauseRecord {
            page: 2,
            span_start: 10,
            span_end: 90,
            canonical_section_id: " 5.3 ".to_string(),
            change_action: Some("replace".to_string()),
            text: "cap".to_string(),
            confidence: 1.4,
            extracted_facts: Some(serde_json::json!({"cap_amount": 750000})),
            ..ClauseRecord::default()
        };
        let node = build_clause_node(
            record,
            "doc",
            "fam",
            Some(doc_date),
            &FactsUpcasterRegistry::with_defaults(),
            doc_date,
        );
        assert_eq!(node.canonical_section_id, "5.3");
        assert_eq!(node.effective_ts, Some(doc_date));
        assert!(node.inherits_document_date());
        assert_eq!(node.change_action, Some(ChangeAction::Replace));
        assert_eq!(node.confidence, 1.0);
        assert!(node.verify_identity().is_ok());
        assert!(node.extracted_facts.is_some());
    }

    #[test]
    fn unknown_action_and_bad_facts_are_tolerated() {
        let record = ClauseRecord {
            canonical_section_id: "7.1".to_string(),
            change_action: Some("rewrite".to_string()),
            extracted_facts: Some(serde_json::json!("not an object")),
            ..ClauseRecord::default()
        };
        let node = build_clause_node(
            record,
            "doc",
            "fam",
            None,
            &FactsUpcasterRegistry::with_defaults(),
            Utc::now(),
        );
        assert_eq!(node.change_action, None);
        assert!(node.extracted_facts.is_none());
    }

    #[test]
    fn inverted_span_is_rejected() {
        let record = DocumentRecord::from_bytes(b"doc");
        let clause = ClauseRecord {
            canonical_section_id: "1".to_string(),
            span_start: 20,
            span_end: 10,
            ..ClauseRecord::default()
        };
        assert!(matches!(
            validate(&record, &[clause]),
            Err(LineageError::InvalidInput(_))
        ));
    }
}
