//! Effective-date correction of an already-ingested document.

use chrono::{DateTime, Utc};
use tracing::info;

use lineage_core::errors::{LineageError, LineageResult};
use lineage_core::models::{CorrectionReport, MaterializationReport};
use lineage_core::traits::LineageWriter;

use super::assign::assign_versions;
use crate::supersession::materialize::materialize_family;

/// Correct a document's effective date.
///
/// Process:
/// 1. Update the document's `effective_ts`
/// 2. Re-rank its family (arrival ranks are kept)
/// 3. Move clause nodes that inherited the document date to the new date
/// 4. Refold every section of the family
///
/// Nodes that declared their own date keep it. Unversioned documents only
/// get step 1.
pub fn correct_effective_date<W: LineageWriter + ?Sized>(
    writer: &mut W,
    doc_id: &str,
    effective_ts: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> LineageResult<CorrectionReport> {
    let mut document = writer
        .get_document(doc_id)?
        .ok_or_else(|| LineageError::not_found("document", doc_id))?;
    let previous_effective_ts = document.effective_ts;

    let Some(family_id) = document.family_id.clone() else {
        document.effective_ts = effective_ts;
        writer.upsert_document(&document)?;
        info!(doc_id, "corrected effective date of unversioned document");
        return Ok(CorrectionReport {
            doc_id: doc_id.to_string(),
            family_id: None,
            previous_effective_ts,
            effective_ts,
            versions: None,
            sections: MaterializationReport::default(),
        });
    };

    let versions = assign_versions(writer, doc_id, &family_id, effective_ts)?;
    let redated = writer.set_inherited_effective_ts(doc_id, effective_ts)?;
    let sections = materialize_family(writer, &family_id, now)?;

    info!(
        doc_id,
        family_id = %family_id,
        from = ?previous_effective_ts,
        to = ?effective_ts,
        version_timeline = versions.version_timeline,
        redated,
        "corrected effective date"
    );
    Ok(CorrectionReport {
        doc_id: doc_id.to_string(),
        family_id: Some(family_id),
        previous_effective_ts,
        effective_ts,
        versions: Some(versions),
        sections,
    })
}
