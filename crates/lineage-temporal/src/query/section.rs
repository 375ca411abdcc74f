//! Section query resolution against a family's canonical section ids.

use lineage_core::errors::LineageResult;
use lineage_core::models::{ResolvedSection, SectionMatch};
use lineage_core::traits::LineageReader;

/// Slug form of a free-text section query: lower-cased, spaces as `_`.
pub fn semantic_id(prefix: &str, query: &str) -> String {
    format!("{prefix}{}", query.to_lowercase().replace(' ', "_"))
}

/// Resolve `query` to a canonical section id in four steps: exact id,
/// `semantic:` slug, shortest id containing the query (ties broken
/// lexicographically), and finally the query itself, flagged unresolved.
pub fn resolve_section_id(ids: &[String], query: &str, semantic_prefix: &str) -> ResolvedSection {
    let resolved = |id: &str, matched| ResolvedSection {
        query: query.to_string(),
        canonical_section_id: id.to_string(),
        matched,
    };

    if ids.iter().any(|id| id == query) {
        return resolved(query, SectionMatch::Exact);
    }

    let semantic = semantic_id(semantic_prefix, query);
    if ids.iter().any(|id| *id == semantic) {
        return resolved(semantic.as_str(), SectionMatch::Semantic);
    }

    if !query.is_empty() {
        let best = ids
            .iter()
            .filter(|id| id.contains(query))
            .min_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));
        if let Some(id) = best {
            return resolved(id.as_str(), SectionMatch::Substring);
        }
    }

    resolved(query, SectionMatch::Unresolved)
}

/// Resolve `query` within one family.
pub fn resolve<R: LineageReader + ?Sized>(
    reader: &R,
    family_id: &str,
    query: &str,
    semantic_prefix: &str,
) -> LineageResult<ResolvedSection> {
    let ids = reader.section_ids_for_family(family_id)?;
    Ok(resolve_section_id(&ids, query, semantic_prefix))
}
