//! The supersession fold.
//!
//! One pass over a section's clause nodes in chronological order, applying
//! each node's change action to a running baseline and append chain.
//! Materialization folds everything; as-of replay folds up to a cutoff.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use lineage_core::models::{ChangeAction, ClauseNode};

use crate::ordering;

/// Separator between the baseline and each appended part.
pub const PART_SEPARATOR: &str = "\n\n";

/// Outcome of folding one section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoldedSection {
    pub composed_text: Option<String>,
    /// Node that set the final baseline. `None` when deleted or never set.
    pub current_node_id: Option<String>,
    /// Effective date of the last node that changed the state.
    pub effective_ts: Option<DateTime<Utc>>,
    pub deleted: bool,
    pub nodes_applied: usize,
}

#[derive(Default)]
struct FoldState<'a> {
    base: Option<&'a ClauseNode>,
    appends: Vec<&'a str>,
    deleted: bool,
    effective_ts: Option<DateTime<Utc>>,
    applied: usize,
}

impl<'a> FoldState<'a> {
    fn reset_to(&mut self, node: &'a ClauseNode) {
        self.base = Some(node);
        self.appends.clear();
        self.deleted = false;
        self.effective_ts = node.effective_ts;
    }

    fn apply(&mut self, node: &'a ClauseNode, restatement: bool) {
        self.applied += 1;
        if restatement {
            self.reset_to(node);
            return;
        }
        match node.effective_action() {
            // ADD_NEW over an existing baseline behaves as REPLACE.
            ChangeAction::Replace | ChangeAction::AddNew => self.reset_to(node),
            ChangeAction::Append => {
                self.appends.push(&node.clause_text);
                self.deleted = false;
                self.effective_ts = node.effective_ts;
            }
            ChangeAction::Delete => {
                self.base = None;
                self.appends.clear();
                self.deleted = true;
                self.effective_ts = node.effective_ts;
            }
            ChangeAction::NoChange => {
                if self.base.is_none() {
                    self.reset_to(node);
                }
            }
        }
    }

    fn finish(self) -> FoldedSection {
        if self.deleted {
            return FoldedSection {
                composed_text: None,
                current_node_id: None,
                effective_ts: self.effective_ts,
                deleted: true,
                nodes_applied: self.applied,
            };
        }

        let mut parts: Vec<&str> = Vec::with_capacity(self.appends.len() + 1);
        if let Some(base) = self.base.filter(|b| !b.clause_text.is_empty()) {
            parts.push(&base.clause_text);
        }
        parts.extend(self.appends.iter().copied());

        FoldedSection {
            composed_text: (!parts.is_empty()).then(|| parts.join(PART_SEPARATOR)),
            current_node_id: self.base.map(|b| b.node_id.clone()),
            effective_ts: self.effective_ts,
            deleted: false,
            nodes_applied: self.applied,
        }
    }
}

/// Fold the nodes of one section.
///
/// `restatement_docs` holds the ids of documents classified as restatements;
/// their nodes reset the baseline whatever their action. With a `cutoff`,
/// only nodes dated on or before it take part and undated nodes are
/// skipped. Returns `None` when no node takes part.
pub fn fold_section(
    nodes: &[ClauseNode],
    restatement_docs: &HashSet<String>,
    cutoff: Option<DateTime<Utc>>,
) -> Option<FoldedSection> {
    let mut ordered: Vec<&ClauseNode> = nodes
        .iter()
        .filter(|n| match cutoff {
            None => true,
            Some(cutoff) => n.effective_ts.is_some_and(|ts| ts <= cutoff),
        })
        .collect();
    if ordered.is_empty() {
        return None;
    }
    ordered.sort_by(|a, b| ordering::fold_cmp(a, b));

    let mut state = FoldState::default();
    for node in ordered {
        state.apply(node, restatement_docs.contains(&node.doc_id));
    }
    Some(state.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use lineage_core::hashing;

    fn date(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn node(
        doc: &str,
        seq: u64,
        action: Option<ChangeAction>,
        effective: Option<DateTime<Utc>>,
        text: &str,
    ) -> ClauseNode {
        ClauseNode {
            node_id: hashing::node_id(doc, 1, seq, seq + 10, "5.3"),
            doc_id: doc.to_string(),
            family_id: "fam".to_string(),
            canonical_section_id: "5.3".to_string(),
            section_title: None,
            referenced_section_id: None,
            modifies_section_id: None,
            change_action: action,
            effective_ts: effective,
            declared_effective_ts: None,
            page: 1,
            span_start: seq,
            span_end: seq + 10,
            clause_text: text.to_string(),
            extracted_facts: None,
            confidence: 0.9,
            created_at: date(2025, 1, 1),
            arrival_seq: seq,
        }
    }

    fn fold(nodes: &[ClauseNode]) -> FoldedSection {
        fold_section(nodes, &HashSet::new(), None).unwrap()
    }

    #[test]
    fn later_replace_wins_and_clears_appends() {
        let nodes = vec![
            node("m", 1, None, Some(date(2024, 1, 1)), "v1"),
            node("a1", 2, Some(ChangeAction::Append), Some(date(2024, 2, 1)), "extra"),
            node("a2", 3, Some(ChangeAction::Replace), Some(date(2024, 3, 1)), "v2"),
        ];
        let folded = fold(&nodes);
        assert_eq!(folded.composed_text.as_deref(), Some("v2"));
        assert_eq!(folded.current_node_id, Some(nodes[2].node_id.clone()));
        assert_eq!(folded.effective_ts, Some(date(2024, 3, 1)));
    }

    #[test]
    fn appends_compose_in_order() {
        let nodes = vec![
            node("a2", 3, Some(ChangeAction::Append), Some(date(2024, 3, 1)), "second"),
            node("m", 1, None, Some(date(2024, 1, 1)), "base"),
            node("a1", 2, Some(ChangeAction::Append), Some(date(2024, 2, 1)), "first"),
        ];
        let folded = fold(&nodes);
        assert_eq!(folded.composed_text.as_deref(), Some("base\n\nfirst\n\nsecond"));
        assert_eq!(folded.current_node_id, Some(nodes[1].node_id.clone()));
    }

    #[test]
    fn delete_clears_text_and_pointer() {
        let nodes = vec![
            node("m", 1, None, Some(date(2024, 1, 1)), "base"),
            node("a1", 2, Some(ChangeAction::Delete), Some(date(2024, 2, 1)), ""),
        ];
        let folded = fold(&nodes);
        assert!(folded.deleted);
        assert_eq!(folded.composed_text, None);
        assert_eq!(folded.current_node_id, None);
        assert_eq!(folded.effective_ts, Some(date(2024, 2, 1)));
    }

    #[test]
    fn append_after_delete_revives_section() {
        let nodes = vec![
            node("m", 1, None, Some(date(2024, 1, 1)), "base"),
            node("a1", 2, Some(ChangeAction::Delete), Some(date(2024, 2, 1)), ""),
            node("a2", 3, Some(ChangeAction::Append), Some(date(2024, 3, 1)), "revived"),
        ];
        let folded = fold(&nodes);
        assert!(!folded.deleted);
        assert_eq!(folded.composed_text.as_deref(), Some("revived"));
        assert_eq!(folded.current_node_id, None);
    }

    #[test]
    fn no_change_only_establishes_missing_baseline() {
        let nodes = vec![
            node("m", 1, Some(ChangeAction::NoChange), Some(date(2024, 1, 1)), "first"),
            node("a", 2, Some(ChangeAction::NoChange), Some(date(2024, 2, 1)), "ignored"),
        ];
        let folded = fold(&nodes);
        assert_eq!(folded.composed_text.as_deref(), Some("first"));
        assert_eq!(folded.effective_ts, Some(date(2024, 1, 1)));
    }

    #[test]
    fn add_new_over_baseline_replaces() {
        let nodes = vec![
            node("m", 1, None, Some(date(2024, 1, 1)), "old"),
            node("a", 2, Some(ChangeAction::AddNew), Some(date(2024, 2, 1)), "new"),
        ];
        assert_eq!(fold(&nodes).composed_text.as_deref(), Some("new"));
    }

    #[test]
    fn restatement_resets_regardless_of_action() {
        let nodes = vec![
            node("m", 1, None, Some(date(2024, 1, 1)), "base"),
            node("a", 2, Some(ChangeAction::Append), Some(date(2024, 2, 1)), "extra"),
            node("r", 3, Some(ChangeAction::Append), Some(date(2024, 3, 1)), "restated"),
        ];
        let restated: HashSet<String> = ["r".to_string()].into_iter().collect();
        let folded = fold_section(&nodes, &restated, None).unwrap();
        assert_eq!(folded.composed_text.as_deref(), Some("restated"));
        assert_eq!(folded.current_node_id, Some(nodes[2].node_id.clone()));
    }

    #[test]
    fn cutoff_excludes_later_and_undated_nodes() {
        let nodes = vec![
            node("m", 1, None, Some(date(2024, 1, 1)), "v1"),
            node("a", 2, Some(ChangeAction::Replace), Some(date(2024, 6, 1)), "v2"),
            node("u", 3, Some(ChangeAction::Replace), None, "undated"),
        ];
        let folded = fold_section(&nodes, &HashSet::new(), Some(date(2024, 3, 1))).unwrap();
        assert_eq!(folded.composed_text.as_deref(), Some("v1"));
        assert_eq!(folded.nodes_applied, 1);

        assert!(fold_section(&nodes, &HashSet::new(), Some(date(2023, 12, 31))).is_none());
    }

    #[test]
    fn undated_nodes_fold_last_without_cutoff() {
        let nodes = vec![
            node("u", 1, Some(ChangeAction::Replace), None, "undated"),
            node("m", 2, None, Some(date(2024, 1, 1)), "dated"),
        ];
        assert_eq!(fold(&nodes).composed_text.as_deref(), Some("undated"));
    }
}
