//! Point-in-time replay of a section.

use chrono::{DateTime, Utc};

use lineage_core::errors::{LineageError, LineageResult};
use lineage_core::models::{AsOfSection, Family, SectionStatus};
use lineage_core::traits::LineageReader;

use super::section;
use crate::supersession::fold_section;
use crate::supersession::materialize::restatement_docs;

/// Fold the section's nodes dated on or before `as_of`. Nothing is stored.
///
/// Undated nodes never take part. `NotFound` when no node qualifies.
pub fn execute_as_of<R: LineageReader + ?Sized>(
    reader: &R,
    family: &Family,
    section_query: &str,
    as_of: DateTime<Utc>,
    semantic_prefix: &str,
) -> LineageResult<AsOfSection> {
    let resolved = section::resolve(reader, &family.family_id, section_query, semantic_prefix)?;
    let nodes = reader.nodes_for_section(&family.family_id, &resolved.canonical_section_id)?;
    let restated = restatement_docs(reader, &nodes)?;

    let folded = fold_section(&nodes, &restated, Some(as_of)).ok_or_else(|| {
        LineageError::not_found(
            "section as of",
            format!(
                "{}/{} at {}",
                family.family_id,
                resolved.canonical_section_id,
                as_of.to_rfc3339()
            ),
        )
    })?;

    Ok(AsOfSection {
        family_id: family.family_id.clone(),
        section: resolved,
        as_of,
        status: if folded.deleted {
            SectionStatus::Deleted
        } else {
            SectionStatus::Active
        },
        composed_text: folded.composed_text,
        current_node_id: folded.current_node_id,
        effective_ts: folded.effective_ts,
    })
}
