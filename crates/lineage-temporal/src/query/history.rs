//! Chronological history of a section.

use std::collections::HashMap;

use lineage_core::errors::{LineageError, LineageResult};
use lineage_core::models::{ContractDocument, Family, HistoryEntry, SectionHistory};
use lineage_core::traits::LineageReader;

use super::section;
use crate::ordering;

/// Every clause node of the section in fold order, each with its owning
/// document's timeline version and type.
pub fn execute_history<R: LineageReader + ?Sized>(
    reader: &R,
    family: &Family,
    section_query: &str,
    semantic_prefix: &str,
) -> LineageResult<SectionHistory> {
    let resolved = section::resolve(reader, &family.family_id, section_query, semantic_prefix)?;
    let mut nodes = reader.nodes_for_section(&family.family_id, &resolved.canonical_section_id)?;
    if nodes.is_empty() {
        return Err(LineageError::not_found(
            "section history",
            format!("{}/{}", family.family_id, resolved.canonical_section_id),
        ));
    }
    ordering::sort_for_fold(&mut nodes);

    let mut documents: HashMap<String, Option<ContractDocument>> = HashMap::new();
    let mut entries = Vec::with_capacity(nodes.len());
    for node in nodes {
        if !documents.contains_key(&node.doc_id) {
            let document = reader.get_document(&node.doc_id)?;
            documents.insert(node.doc_id.clone(), document);
        }
        let owner = documents.get(&node.doc_id).and_then(Option::as_ref);
        entries.push(HistoryEntry {
            doc_version: owner.and_then(|d| d.version_timeline),
            doc_type: owner.and_then(|d| d.doc_type),
            node_id: node.node_id,
            doc_id: node.doc_id,
            change_action: node.change_action,
            effective_ts: node.effective_ts,
            clause_text: node.clause_text,
            extracted_facts: node.extracted_facts,
            confidence: node.confidence,
        });
    }

    Ok(SectionHistory {
        family_id: family.family_id.clone(),
        section: resolved,
        entries,
    })
}
