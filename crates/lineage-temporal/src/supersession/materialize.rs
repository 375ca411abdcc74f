//! Materialization of folded sections into `FamilySectionCurrent`.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use tracing::{debug, error, warn};

use lineage_core::errors::LineageResult;
use lineage_core::models::{
    ClauseNode, FamilySectionCurrent, MaterializationReport, SectionFailure, SectionKey,
};
use lineage_core::traits::{LineageReader, LineageWriter};

use super::fold::fold_section;

/// What happened to one section's materialized row.
#[derive(Debug, Clone, PartialEq)]
pub enum MaterializeOutcome {
    /// The folded content changed and the row was written.
    Written(FamilySectionCurrent),
    /// The folded content matched the stored row; nothing was written.
    Unchanged(FamilySectionCurrent),
    /// No nodes remain; the stored row was deleted.
    Removed,
    /// No nodes and no row.
    Absent,
}

impl MaterializeOutcome {
    pub fn row(&self) -> Option<&FamilySectionCurrent> {
        match self {
            Self::Written(row) | Self::Unchanged(row) => Some(row),
            Self::Removed | Self::Absent => None,
        }
    }

    pub fn into_row(self) -> Option<FamilySectionCurrent> {
        match self {
            Self::Written(row) | Self::Unchanged(row) => Some(row),
            Self::Removed | Self::Absent => None,
        }
    }
}

/// Ids of restatement documents among the owners of `nodes`.
pub fn restatement_docs<R: LineageReader + ?Sized>(
    reader: &R,
    nodes: &[ClauseNode],
) -> LineageResult<HashSet<String>> {
    let owners: HashSet<&str> = nodes.iter().map(|n| n.doc_id.as_str()).collect();
    let mut restated = HashSet::new();
    for doc_id in owners {
        if let Some(document) = reader.get_document(doc_id)? {
            if document.is_restatement() {
                restated.insert(document.doc_id);
            }
        }
    }
    Ok(restated)
}

/// Fold one section and store the result.
///
/// Fails with `IntegrityViolation` when a stored node does not hash to its
/// own id. The update timestamp only moves when the content changes, so a
/// repeated call over the same nodes leaves the row byte-identical.
pub fn materialize_section<W: LineageWriter + ?Sized>(
    writer: &mut W,
    family_id: &str,
    canonical_section_id: &str,
    now: DateTime<Utc>,
) -> LineageResult<MaterializeOutcome> {
    let nodes = writer.nodes_for_section(family_id, canonical_section_id)?;
    for node in &nodes {
        node.verify_identity()?;
    }

    let restated = restatement_docs(&*writer, &nodes)?;
    let Some(folded) = fold_section(&nodes, &restated, None) else {
        let removed = writer.delete_current(family_id, canonical_section_id)?;
        debug!(family_id, section = canonical_section_id, removed, "section has no nodes");
        return Ok(if removed {
            MaterializeOutcome::Removed
        } else {
            MaterializeOutcome::Absent
        });
    };

    let row = FamilySectionCurrent {
        family_id: family_id.to_string(),
        canonical_section_id: canonical_section_id.to_string(),
        current_node_id: folded.current_node_id,
        current_effective_ts: folded.effective_ts,
        composed_text: folded.composed_text,
        updated_at: now,
    };

    if let Some(existing) = writer.get_current(family_id, canonical_section_id)? {
        if existing.same_content(&row) {
            debug!(family_id, section = canonical_section_id, "section unchanged");
            return Ok(MaterializeOutcome::Unchanged(existing));
        }
    }

    writer.upsert_current(&row)?;
    debug!(
        family_id,
        section = canonical_section_id,
        nodes = folded.nodes_applied,
        deleted = folded.deleted,
        "section materialized"
    );
    Ok(MaterializeOutcome::Written(row))
}

/// Materialize a batch of sections of one family.
///
/// A failing section is recorded in the report and does not stop its
/// siblings. An integrity violation aborts the whole batch.
pub fn materialize_sections<W: LineageWriter + ?Sized>(
    writer: &mut W,
    family_id: &str,
    section_ids: &[String],
    now: DateTime<Utc>,
) -> LineageResult<MaterializationReport> {
    let mut report = MaterializationReport::default();
    for section in section_ids {
        let key = SectionKey::new(family_id, section.as_str());
        match materialize_section(writer, family_id, section, now) {
            Ok(MaterializeOutcome::Written(_) | MaterializeOutcome::Unchanged(_)) => {
                report.materialized.push(key);
            }
            Ok(MaterializeOutcome::Removed | MaterializeOutcome::Absent) => {
                report.removed.push(key);
            }
            Err(e) if e.is_fatal() => {
                error!(family_id, section = %section, error = %e, "integrity violation during materialization");
                return Err(e);
            }
            Err(e) => {
                warn!(family_id, section = %section, error = %e, "section materialization failed");
                report.failed.push(SectionFailure {
                    key,
                    error: e.to_string(),
                });
            }
        }
    }
    Ok(report)
}

/// Materialize every section of a family, dropping rows whose section has
/// no nodes left.
pub fn materialize_family<W: LineageWriter + ?Sized>(
    writer: &mut W,
    family_id: &str,
    now: DateTime<Utc>,
) -> LineageResult<MaterializationReport> {
    let mut sections = writer.section_ids_for_family(family_id)?;
    for row in writer.current_rows_for_family(family_id)? {
        if !sections.contains(&row.canonical_section_id) {
            sections.push(row.canonical_section_id);
        }
    }
    materialize_sections(writer, family_id, &sections, now)
}
