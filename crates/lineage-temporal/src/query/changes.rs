//! What one timeline version of a family did to a section.

use lineage_core::errors::{LineageError, LineageResult};
use lineage_core::models::{ClauseChange, Family, VersionChanges};
use lineage_core::traits::LineageReader;

use super::section;

/// Clauses the document at `version_timeline` contributed to the section.
///
/// An empty change list is a valid answer; only a missing version is
/// `NotFound`.
pub fn execute_change_at_version<R: LineageReader + ?Sized>(
    reader: &R,
    family: &Family,
    section_query: &str,
    version_timeline: u32,
    semantic_prefix: &str,
) -> LineageResult<VersionChanges> {
    let resolved = section::resolve(reader, &family.family_id, section_query, semantic_prefix)?;
    let document = reader
        .document_at_timeline_version(&family.family_id, version_timeline)?
        .ok_or_else(|| {
            LineageError::not_found(
                "document version",
                format!("{} v{version_timeline}", family.family_id),
            )
        })?;

    let changes = reader
        .nodes_for_document_section(&document.doc_id, &resolved.canonical_section_id)?
        .into_iter()
        .map(|node| ClauseChange {
            node_id: node.node_id,
            change_action: node.change_action,
            clause_text: node.clause_text,
            modifies_section_id: node.modifies_section_id,
            referenced_section_id: node.referenced_section_id,
            effective_ts: node.effective_ts,
            extracted_facts: node.extracted_facts,
            confidence: node.confidence,
        })
        .collect();

    Ok(VersionChanges {
        family_id: family.family_id.clone(),
        section: resolved,
        doc_version: version_timeline,
        doc_id: document.doc_id,
        doc_type: document.doc_type,
        changes,
    })
}
