//! Version assignment: arrival rank and effective-date rank per family.

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use lineage_core::errors::{LineageError, LineageResult};
use lineage_core::models::{ContractDocument, VersionStamp};
use lineage_core::traits::LineageWriter;

use crate::ordering;

/// Assign `version_ingest` and recompute `version_timeline` for a family.
///
/// The document is moved into `family_id` with `effective_ts`. Its arrival
/// rank is kept when it already has one in this family; otherwise it gets
/// one past the family's current maximum. Timeline ranks are recomputed for
/// every document and only rows whose rank changed are rewritten.
pub fn assign_versions<W: LineageWriter + ?Sized>(
    writer: &mut W,
    doc_id: &str,
    family_id: &str,
    effective_ts: Option<DateTime<Utc>>,
) -> LineageResult<VersionStamp> {
    let mut document = writer
        .get_document(doc_id)?
        .ok_or_else(|| LineageError::not_found("document", doc_id))?;
    let siblings = writer.documents_in_family(family_id)?;

    let kept_rank = document
        .version_ingest
        .filter(|_| document.family_id.as_deref() == Some(family_id));
    let version_ingest = match kept_rank {
        Some(rank) => rank,
        None => {
            siblings
                .iter()
                .filter(|d| d.doc_id != doc_id)
                .filter_map(|d| d.version_ingest)
                .max()
                .unwrap_or(0)
                + 1
        }
    };

    document.family_id = Some(family_id.to_string());
    document.effective_ts = effective_ts;
    document.version_ingest = Some(version_ingest);
    writer.upsert_document(&document)?;

    let version_timeline = recompute_timeline(writer, family_id, doc_id)?;

    info!(
        doc_id,
        family_id,
        version_ingest,
        version_timeline,
        "assigned document versions"
    );
    Ok(VersionStamp {
        version_ingest,
        version_timeline,
    })
}

/// Re-rank every document in the family by effective date. Returns the
/// rank of `doc_id`.
pub fn recompute_timeline<W: LineageWriter + ?Sized>(
    writer: &mut W,
    family_id: &str,
    doc_id: &str,
) -> LineageResult<u32> {
    rerank_family(writer, family_id)?
        .iter()
        .find(|d| d.doc_id == doc_id)
        .and_then(|d| d.version_timeline)
        .ok_or_else(|| {
            LineageError::IntegrityViolation(format!(
                "document {doc_id} missing from family {family_id} after assignment"
            ))
        })
}

/// Assign timeline ranks 1..=n to the family's documents by effective date
/// and rewrite the rows whose rank changed. Returns the documents in
/// timeline order.
pub fn rerank_family<W: LineageWriter + ?Sized>(
    writer: &mut W,
    family_id: &str,
) -> LineageResult<Vec<ContractDocument>> {
    let mut documents: Vec<ContractDocument> = writer.documents_in_family(family_id)?;
    ordering::sort_timeline(&mut documents);

    for (index, document) in documents.iter_mut().enumerate() {
        let rank = u32::try_from(index + 1).map_err(|_| {
            LineageError::IntegrityViolation(format!("family {family_id} has too many documents"))
        })?;
        if document.version_timeline != Some(rank) {
            debug!(
                doc_id = %document.doc_id,
                from = ?document.version_timeline,
                to = rank,
                "timeline rank changed"
            );
            document.version_timeline = Some(rank);
            writer.upsert_document(document)?;
        }
    }
    Ok(documents)
}
