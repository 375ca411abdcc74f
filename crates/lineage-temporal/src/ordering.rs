//! Chronological orderings shared by version assignment and the fold.
//!
//! Both sort by effective date ascending with undated entries last, then by
//! arrival (creation timestamp, then store sequence).

use std::cmp::Ordering;

use chrono::{DateTime, Utc};

use lineage_core::models::{ClauseNode, ContractDocument};

fn effective_date_cmp(a: Option<DateTime<Utc>>, b: Option<DateTime<Utc>>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

pub fn timeline_cmp(a: &ContractDocument, b: &ContractDocument) -> Ordering {
    effective_date_cmp(a.effective_ts, b.effective_ts)
        .then_with(|| a.created_at.cmp(&b.created_at))
        .then_with(|| a.arrival_seq.cmp(&b.arrival_seq))
        .then_with(|| a.doc_id.cmp(&b.doc_id))
}

pub fn fold_cmp(a: &ClauseNode, b: &ClauseNode) -> Ordering {
    effective_date_cmp(a.effective_ts, b.effective_ts)
        .then_with(|| a.created_at.cmp(&b.created_at))
        .then_with(|| a.arrival_seq.cmp(&b.arrival_seq))
        .then_with(|| a.node_id.cmp(&b.node_id))
}

/// Sort documents into `version_timeline` order.
pub fn sort_timeline(documents: &mut [ContractDocument]) {
    documents.sort_by(timeline_cmp);
}

/// Sort clause nodes into fold order.
pub fn sort_for_fold(nodes: &mut [ClauseNode]) {
    nodes.sort_by(fold_cmp);
}
