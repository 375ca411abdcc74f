//! Property tests for the supersession fold.

use std::collections::HashSet;

use chrono::{Duration, Utc};
use proptest::prelude::*;

use lineage_core::hashing;
use lineage_core::models::{ChangeAction, ClauseNode};
use lineage_temporal::supersession::fold_section;
use test_fixtures::date;

fn action_strategy() -> impl Strategy<Value = Option<ChangeAction>> {
    prop_oneof![
        Just(None),
        Just(Some(ChangeAction::Replace)),
        Just(Some(ChangeAction::Append)),
        Just(Some(ChangeAction::AddNew)),
        Just(Some(ChangeAction::Delete)),
        Just(Some(ChangeAction::NoChange)),
    ]
}

fn nodes_strategy() -> impl Strategy<Value = Vec<ClauseNode>> {
    prop::collection::vec((action_strategy(), 0i64..400, "[a-z]{1,12}"), 1..12).prop_map(
        |specs| {
            specs
                .into_iter()
                .enumerate()
                .map(|(i, (action, day, text))| {
                    let doc_id = format!("doc-{i}");
                    let start = i as u64 * 100;
                    ClauseNode {
                        node_id: hashing::node_id(&doc_id, 1, start, start + 50, "5.3"),
                        doc_id,
                        family_id: "fam".to_string(),
                        canonical_section_id: "5.3".to_string(),
                        section_title: None,
                        referenced_section_id: None,
                        modifies_section_id: None,
                        change_action: action,
                        effective_ts: Some(date(2024, 1, 1) + Duration::days(day)),
                        declared_effective_ts: None,
                        page: 1,
                        span_start: start,
                        span_end: start + 50,
                        clause_text: text,
                        extracted_facts: None,
                        confidence: 0.5,
                        created_at: Utc::now(),
                        arrival_seq: i as u64 + 1,
                    }
                })
                .collect()
        },
    )
}

proptest! {
    #[test]
    fn prop_fold_ignores_input_order(nodes in nodes_strategy()) {
        let none = HashSet::new();
        let forward = fold_section(&nodes, &none, None);
        let mut reversed = nodes.clone();
        reversed.reverse();
        prop_assert_eq!(forward, fold_section(&reversed, &none, None));
    }

    #[test]
    fn prop_cutoff_after_last_node_equals_full_fold(nodes in nodes_strategy()) {
        let none = HashSet::new();
        let latest = nodes.iter().filter_map(|n| n.effective_ts).max().unwrap();
        prop_assert_eq!(
            fold_section(&nodes, &none, None),
            fold_section(&nodes, &none, Some(latest))
        );
    }

    #[test]
    fn prop_deleted_sections_have_no_text_or_pointer(nodes in nodes_strategy()) {
        let folded = fold_section(&nodes, &HashSet::new(), None).unwrap();
        if folded.deleted {
            prop_assert!(folded.composed_text.is_none());
            prop_assert!(folded.current_node_id.is_none());
        }
    }

    #[test]
    fn prop_last_node_restatement_wins(nodes in nodes_strategy()) {
        let last = nodes
            .iter()
            .max_by_key(|n| (n.effective_ts, n.arrival_seq))
            .unwrap()
            .clone();
        let restated: HashSet<String> = [last.doc_id.clone()].into_iter().collect();
        let folded = fold_section(&nodes, &restated, None).unwrap();
        prop_assert_eq!(folded.composed_text, Some(last.clause_text.clone()));
        prop_assert_eq!(folded.current_node_id, Some(last.node_id.clone()));
    }
}
