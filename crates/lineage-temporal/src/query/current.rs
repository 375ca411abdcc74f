//! Current state of a section, read from the materialized table.

use lineage_core::errors::{LineageError, LineageResult};
use lineage_core::models::{CurrentSection, Family};
use lineage_core::traits::LineageReader;

use super::section;

pub fn execute_current<R: LineageReader + ?Sized>(
    reader: &R,
    family: &Family,
    section_query: &str,
    semantic_prefix: &str,
) -> LineageResult<CurrentSection> {
    let resolved = section::resolve(reader, &family.family_id, section_query, semantic_prefix)?;
    let row = reader
        .get_current(&family.family_id, &resolved.canonical_section_id)?
        .ok_or_else(|| {
            LineageError::not_found(
                "current section",
                format!("{}/{}", family.family_id, resolved.canonical_section_id),
            )
        })?;

    Ok(CurrentSection {
        family_id: row.family_id,
        section: resolved,
        composed_text: row.composed_text,
        current_node_id: row.current_node_id,
        current_effective_ts: row.current_effective_ts,
        updated_at: row.updated_at,
    })
}
