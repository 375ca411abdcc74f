//! Engine-level tests over both storage adapters.

use std::sync::Arc;
use std::thread;

use lineage_core::config::LineageConfig;
use lineage_core::errors::LineageError;
use lineage_core::models::{
    DocQuality, DocType, FamilySelector, SectionKey, SectionMatch, SectionStatus,
};
use lineage_core::traits::{LineageReader, LineageStorage};
use lineage_storage::{MemoryLineageStorage, SqliteLineageStorage};
use lineage_temporal::LineageEngine;
use test_fixtures::{date, ClauseBuilder, DocumentBuilder};

fn memory_engine() -> LineageEngine<MemoryLineageStorage> {
    LineageEngine::new(MemoryLineageStorage::new(), LineageConfig::default()).unwrap()
}

fn sqlite_engine() -> (tempfile::TempDir, LineageEngine<SqliteLineageStorage>) {
    let dir = tempfile::tempdir().unwrap();
    let storage = SqliteLineageStorage::open(&dir.path().join("lineage.db"), 2).unwrap();
    (dir, LineageEngine::new(storage, LineageConfig::default()).unwrap())
}

fn acme() -> FamilySelector {
    FamilySelector::parties("acme", "widget")
}

// ---------------------------------------------------------------------------
// Families and versions
// ---------------------------------------------------------------------------

fn out_of_order_arrival<S: LineageStorage>(engine: &LineageEngine<S>) {
    let june = engine
        .ingest_document(
            DocumentBuilder::new("june amendment")
                .doc_type("amendment")
                .effective(date(2024, 6, 1))
                .parties("Acme", "Widget")
                .build(),
            vec![],
        )
        .unwrap();
    let january = engine
        .ingest_document(
            DocumentBuilder::new("january master")
                .doc_type("master")
                .effective(date(2024, 1, 1))
                .parties("Widget", "Acme")
                .build(),
            vec![],
        )
        .unwrap();

    assert_eq!(june.family_id, january.family_id);
    assert_eq!(june.version_ingest, Some(1));
    assert_eq!(january.version_ingest, Some(2));
    assert_eq!(january.version_timeline, Some(1));

    let stored = engine
        .storage()
        .read(|r| r.get_document(&june.doc_id))
        .unwrap()
        .unwrap();
    assert_eq!(stored.version_ingest, Some(1));
    assert_eq!(stored.version_timeline, Some(2));
}

#[test]
fn out_of_order_arrival_memory() {
    out_of_order_arrival(&memory_engine());
}

#[test]
fn out_of_order_arrival_sqlite() {
    let (_dir, engine) = sqlite_engine();
    out_of_order_arrival(&engine);
}

#[test]
fn match_or_create_is_idempotent_across_swapped_names() {
    let engine = memory_engine();
    let first = engine.match_or_create_family("acme", "widget").unwrap();
    let second = engine.match_or_create_family("Widget", " ACME ").unwrap();
    assert_eq!(first, second);
    assert!(engine.find_family("widget", "acme").unwrap().is_some());
    assert!(engine.find_family("acme", "gadget").unwrap().is_none());
}

#[test]
fn concurrent_family_creation_yields_one_family() {
    let (_dir, engine) = sqlite_engine();
    let engine = Arc::new(engine);
    let ids: Vec<String> = (0..8)
        .map(|i| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                if i % 2 == 0 {
                    engine.match_or_create_family("acme", "widget")
                } else {
                    engine.match_or_create_family("widget", "acme")
                }
            })
        })
        .collect::<Vec<_>>()
        .into_iter()
        .map(|h| h.join().unwrap().unwrap())
        .collect();
    assert!(ids.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(engine.storage().read(|r| r.list_family_ids()).unwrap().len(), 1);
}

#[test]
fn concurrent_ingestion_assigns_distinct_ranks() {
    let (_dir, engine) = sqlite_engine();
    let engine = Arc::new(engine);
    let handles: Vec<_> = (1..=6u32)
        .map(|month| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                engine.ingest_document(
                    DocumentBuilder::new(&format!("amendment {month}"))
                        .doc_type("amendment")
                        .effective(date(2024, month, 1))
                        .parties("acme", "widget")
                        .build(),
                    vec![ClauseBuilder::new("7.1", &format!("fee schedule {month}"))
                        .action("REPLACE")
                        .build()],
                )
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap().unwrap();
    }

    let family = engine.find_family("acme", "widget").unwrap().unwrap();
    let docs = engine
        .storage()
        .read(|r| r.documents_in_family(&family.family_id))
        .unwrap();
    let mut ingest: Vec<u32> = docs.iter().filter_map(|d| d.version_ingest).collect();
    ingest.sort_unstable();
    assert_eq!(ingest, vec![1, 2, 3, 4, 5, 6]);
    for doc in &docs {
        let month = doc.effective_ts.unwrap().format("%m").to_string();
        assert_eq!(doc.version_timeline.unwrap(), month.parse::<u32>().unwrap());
    }

    let current = engine.current(&acme(), "7.1").unwrap();
    assert_eq!(current.composed_text.as_deref(), Some("fee schedule 6"));
}

// ---------------------------------------------------------------------------
// Supersession through ingestion
// ---------------------------------------------------------------------------

fn ingest_master<S: LineageStorage>(engine: &LineageEngine<S>, text: &str) {
    engine
        .ingest_document(
            DocumentBuilder::new("master")
                .doc_type("master")
                .effective(date(2024, 1, 1))
                .parties("acme", "widget")
                .build(),
            vec![ClauseBuilder::new("5.3", text).build()],
        )
        .unwrap();
}

#[test]
fn append_chain_composes_in_effective_order() {
    let engine = memory_engine();
    ingest_master(&engine, "base");
    for (month, part) in [(5, "second"), (3, "first")] {
        engine
            .ingest_document(
                DocumentBuilder::new(part)
                    .doc_type("addendum")
                    .effective(date(2024, month, 1))
                    .parties("acme", "widget")
                    .build(),
                vec![ClauseBuilder::new("5.3", part).action("APPEND").build()],
            )
            .unwrap();
    }
    let current = engine.current(&acme(), "5.3").unwrap();
    assert_eq!(current.composed_text.as_deref(), Some("base\n\nfirst\n\nsecond"));
}

#[test]
fn delete_keeps_an_empty_row() {
    let engine = memory_engine();
    ingest_master(&engine, "base");
    engine
        .ingest_document(
            DocumentBuilder::new("deletion")
                .doc_type("amendment")
                .effective(date(2024, 2, 1))
                .parties("acme", "widget")
                .build(),
            vec![ClauseBuilder::new("5.3", "Section 5.3 is deleted.")
                .action("DELETE")
                .build()],
        )
        .unwrap();

    let current = engine.current(&acme(), "5.3").unwrap();
    assert_eq!(current.composed_text, None);
    assert_eq!(current.current_node_id, None);

    let before = engine.as_of(&acme(), "5.3", date(2024, 1, 15)).unwrap();
    assert_eq!(before.status, SectionStatus::Active);
    let after = engine.as_of(&acme(), "5.3", date(2024, 3, 1)).unwrap();
    assert_eq!(after.status, SectionStatus::Deleted);
}

#[test]
fn restatement_resets_even_with_append() {
    let engine = memory_engine();
    ingest_master(&engine, "base");
    engine
        .ingest_document(
            DocumentBuilder::new("restated agreement")
                .doc_type("RESTATEMENT")
                .effective(date(2024, 9, 1))
                .parties("acme", "widget")
                .build(),
            vec![ClauseBuilder::new("5.3", "restated text").action("APPEND").build()],
        )
        .unwrap();
    let current = engine.current(&acme(), "5.3").unwrap();
    assert_eq!(current.composed_text.as_deref(), Some("restated text"));
}

#[test]
fn rematerialization_is_byte_identical() {
    let engine = memory_engine();
    ingest_master(&engine, "base");
    let family = engine.find_family("acme", "widget").unwrap().unwrap();
    let first = engine.materialize_section(&family.family_id, "5.3").unwrap();
    let second = engine.materialize_section(&family.family_id, "5.3").unwrap();
    assert_eq!(first, second);
    assert!(engine.materialize_section(&family.family_id, "99").unwrap().is_none());
}

#[test]
fn rebuild_all_restores_materialized_rows() {
    let (_dir, engine) = sqlite_engine();
    ingest_master(&engine, "base");
    let family = engine.find_family("acme", "widget").unwrap().unwrap();
    let before = engine.current(&acme(), "5.3").unwrap();

    let report = engine.rebuild_all().unwrap();
    assert!(report.is_clean());
    assert_eq!(report.materialized.len(), 1);

    let after = engine.current(&acme(), "5.3").unwrap();
    assert_eq!(before.composed_text, after.composed_text);
    assert_eq!(before.current_node_id, after.current_node_id);

    let family_report = engine.materialize_family(&family.family_id).unwrap();
    assert_eq!(family_report.materialized.len(), 1);
    assert!(engine.materialize_family("missing").unwrap_err().is_not_found());
}

// ---------------------------------------------------------------------------
// Ingestion edge cases
// ---------------------------------------------------------------------------

#[test]
fn reingesting_the_same_file_is_skipped() {
    let engine = memory_engine();
    let record = DocumentBuilder::new("master")
        .parties("acme", "widget")
        .effective(date(2024, 1, 1))
        .build();
    let first = engine
        .ingest_document(record.clone(), vec![ClauseBuilder::new("1", "a").build()])
        .unwrap();
    let second = engine
        .ingest_document(record, vec![ClauseBuilder::new("1", "b").build()])
        .unwrap();
    assert!(!first.skipped);
    assert!(second.skipped);
    assert_eq!(second.version_ingest, Some(1));
    assert_eq!(
        engine.current(&acme(), "1").unwrap().composed_text.as_deref(),
        Some("a")
    );
}

#[test]
fn forced_reingest_keeps_arrival_rank() {
    let mut config = LineageConfig::default();
    config.ingestion.force_reingest = true;
    let engine = LineageEngine::new(MemoryLineageStorage::new(), config).unwrap();
    let record = DocumentBuilder::new("master")
        .parties("acme", "widget")
        .effective(date(2024, 1, 1))
        .build();
    engine.ingest_document(record.clone(), vec![]).unwrap();
    let again = engine.ingest_document(record, vec![]).unwrap();
    assert!(!again.skipped);
    assert_eq!(again.version_ingest, Some(1));
}

#[test]
fn document_without_parties_is_stored_unversioned() {
    let engine = memory_engine();
    let report = engine
        .ingest_document(
            DocumentBuilder::new("orphan").doc_type("sow").confidence(0.4).build(),
            vec![ClauseBuilder::new("1", "scope").build()],
        )
        .unwrap();
    assert_eq!(report.family_id, None);
    assert_eq!(report.version_ingest, None);
    assert_eq!(report.clauses_stored, 0);
    assert_eq!(report.quality, DocQuality::Low);
    assert_eq!(report.doc_type, Some(DocType::Sow));

    let stored = engine.storage().read(|r| r.get_document(&report.doc_id)).unwrap();
    assert!(stored.is_some());
}

#[test]
fn unknown_doc_type_is_stored_unclassified() {
    let engine = memory_engine();
    let report = engine
        .ingest_document(
            DocumentBuilder::new("side letter")
                .doc_type("side letter")
                .parties("acme", "widget")
                .build(),
            vec![ClauseBuilder::new("2", "text").action("REWRITE").build()],
        )
        .unwrap();
    assert_eq!(report.doc_type, None);
    assert_eq!(report.clauses_stored, 1);
    let history = engine.history(&acme(), "2").unwrap();
    assert_eq!(history.entries[0].change_action, None);
}

// ---------------------------------------------------------------------------
// Effective-date correction
// ---------------------------------------------------------------------------

#[test]
fn correcting_a_date_reranks_the_family() {
    let engine = memory_engine();
    let first = engine
        .ingest_document(
            DocumentBuilder::new("a")
                .effective(date(2024, 1, 1))
                .parties("acme", "widget")
                .build(),
            vec![],
        )
        .unwrap();
    let second = engine
        .ingest_document(
            DocumentBuilder::new("b")
                .effective(date(2024, 2, 1))
                .parties("acme", "widget")
                .build(),
            vec![],
        )
        .unwrap();
    assert_eq!(second.version_timeline, Some(2));

    let report = engine
        .correct_effective_date(&first.doc_id, Some(date(2024, 12, 1)))
        .unwrap();
    assert_eq!(report.previous_effective_ts, Some(date(2024, 1, 1)));
    let versions = report.versions.unwrap();
    assert_eq!(versions.version_ingest, 1);
    assert_eq!(versions.version_timeline, 2);

    let b = engine
        .storage()
        .read(|r| r.get_document(&second.doc_id))
        .unwrap()
        .unwrap();
    assert_eq!(b.version_timeline, Some(1));
    assert_eq!(b.version_ingest, Some(2));

    assert!(engine
        .correct_effective_date("missing", None)
        .unwrap_err()
        .is_not_found());
}

fn ingest_cap_pair<S: LineageStorage>(engine: &LineageEngine<S>) -> (String, String) {
    let master = engine
        .ingest_document(
            DocumentBuilder::new("cap master")
                .doc_type("master")
                .effective(date(2024, 1, 1))
                .parties("acme", "widget")
                .build(),
            vec![ClauseBuilder::new("5.3", "old cap").action("NO_CHANGE").build()],
        )
        .unwrap();
    let amendment = engine
        .ingest_document(
            DocumentBuilder::new("cap amendment")
                .doc_type("amendment")
                .effective(date(2024, 6, 1))
                .parties("acme", "widget")
                .build(),
            vec![
                ClauseBuilder::new("5.3", "new cap").action("REPLACE").build(),
                ClauseBuilder::new("9.1", "notice by email")
                    .action("ADD_NEW")
                    .effective(date(2024, 7, 1))
                    .build(),
            ],
        )
        .unwrap();
    (master.doc_id, amendment.doc_id)
}

fn correction_flows_into_answers<S: LineageStorage>(engine: &LineageEngine<S>) {
    let (master, amendment) = ingest_cap_pair(engine);
    assert_eq!(
        engine.as_of(&acme(), "5.3", date(2024, 3, 1)).unwrap().composed_text.as_deref(),
        Some("old cap")
    );

    let report = engine
        .correct_effective_date(&amendment, Some(date(2024, 2, 1)))
        .unwrap();
    assert!(report.sections.is_clean());

    let march = engine.as_of(&acme(), "5.3", date(2024, 3, 1)).unwrap();
    assert_eq!(march.composed_text.as_deref(), Some("new cap"));
    let current = engine.current(&acme(), "5.3").unwrap();
    assert_eq!(current.composed_text.as_deref(), Some("new cap"));
    assert_eq!(current.current_effective_ts, Some(date(2024, 2, 1)));

    // A clause with its own date keeps it.
    let notice = engine.history(&acme(), "9.1").unwrap();
    assert_eq!(notice.entries[0].effective_ts, Some(date(2024, 7, 1)));

    // Moving the master past the amendment reorders history to match ranks.
    engine
        .correct_effective_date(&master, Some(date(2024, 12, 1)))
        .unwrap();
    let history = engine.history(&acme(), "5.3").unwrap();
    let timeline: Vec<_> = history
        .entries
        .iter()
        .map(|e| (e.doc_version, e.effective_ts, e.clause_text.as_str()))
        .collect();
    assert_eq!(
        timeline,
        vec![
            (Some(1), Some(date(2024, 2, 1)), "new cap"),
            (Some(2), Some(date(2024, 12, 1)), "old cap"),
        ]
    );
}

#[test]
fn correction_flows_into_answers_memory() {
    correction_flows_into_answers(&memory_engine());
}

#[test]
fn correction_flows_into_answers_sqlite() {
    let (_dir, engine) = sqlite_engine();
    correction_flows_into_answers(&engine);
}

fn forcing_engine() -> LineageEngine<MemoryLineageStorage> {
    let mut config = LineageConfig::default();
    config.ingestion.force_reingest = true;
    LineageEngine::new(MemoryLineageStorage::new(), config).unwrap()
}

#[test]
fn forced_reingest_with_a_new_date_refolds() {
    let engine = forcing_engine();
    ingest_cap_pair(&engine);
    let report = engine
        .ingest_document(
            DocumentBuilder::new("cap amendment")
                .doc_type("amendment")
                .effective(date(2024, 2, 1))
                .parties("acme", "widget")
                .build(),
            vec![ClauseBuilder::new("5.3", "new cap").action("REPLACE").build()],
        )
        .unwrap();
    assert!(!report.skipped);
    assert_eq!(report.version_ingest, Some(2));
    assert_eq!(report.version_timeline, Some(2));

    let march = engine.as_of(&acme(), "5.3", date(2024, 3, 1)).unwrap();
    assert_eq!(march.composed_text.as_deref(), Some("new cap"));
    assert_eq!(
        engine.current(&acme(), "5.3").unwrap().current_effective_ts,
        Some(date(2024, 2, 1))
    );
}

fn forced_reingest_moves_family<S: LineageStorage>(engine: &LineageEngine<S>) {
    let misfiled = DocumentBuilder::new("misfiled master")
        .doc_type("master")
        .effective(date(2024, 1, 1));
    engine
        .ingest_document(
            misfiled.clone().parties("acme", "widget").build(),
            vec![ClauseBuilder::new("5.3", "base").build()],
        )
        .unwrap();
    engine
        .ingest_document(
            DocumentBuilder::new("widget addendum")
                .doc_type("addendum")
                .effective(date(2024, 3, 1))
                .parties("acme", "widget")
                .build(),
            vec![ClauseBuilder::new("5.3", "extra").action("APPEND").build()],
        )
        .unwrap();
    assert_eq!(
        engine.current(&acme(), "5.3").unwrap().composed_text.as_deref(),
        Some("base\n\nextra")
    );

    let report = engine
        .ingest_document(
            misfiled.parties("acme", "gadget").build(),
            vec![ClauseBuilder::new("5.3", "base").build()],
        )
        .unwrap();
    let widget = engine.find_family("acme", "widget").unwrap().unwrap();
    let gadget = engine.find_family("acme", "gadget").unwrap().unwrap();
    assert_eq!(report.family_id.as_deref(), Some(gadget.family_id.as_str()));
    assert_eq!(report.version_ingest, Some(1));
    assert_eq!(report.version_timeline, Some(1));
    assert!(report.sections.removed.is_empty());
    assert!(report
        .sections
        .materialized
        .contains(&SectionKey::new(gadget.family_id.as_str(), "5.3")));
    assert!(report
        .sections
        .materialized
        .contains(&SectionKey::new(widget.family_id.as_str(), "5.3")));

    let gadget_selector = FamilySelector::parties("acme", "gadget");
    let moved = engine.current(&gadget_selector, "5.3").unwrap();
    assert_eq!(moved.composed_text.as_deref(), Some("base"));
    assert_eq!(engine.history(&gadget_selector, "5.3").unwrap().total_versions(), 1);

    let left = engine.current(&acme(), "5.3").unwrap();
    assert_eq!(left.composed_text.as_deref(), Some("extra"));
    assert_eq!(engine.history(&acme(), "5.3").unwrap().total_versions(), 1);
    let remaining = engine
        .storage()
        .read(|r| r.documents_in_family(&widget.family_id))
        .unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].version_timeline, Some(1));
}

#[test]
fn forced_reingest_moves_family_memory() {
    forced_reingest_moves_family(&forcing_engine());
}

#[test]
fn forced_reingest_moves_family_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    let storage = SqliteLineageStorage::open(&dir.path().join("lineage.db"), 2).unwrap();
    let mut config = LineageConfig::default();
    config.ingestion.force_reingest = true;
    let engine = LineageEngine::new(storage, config).unwrap();
    forced_reingest_moves_family(&engine);
}

#[test]
fn concurrent_ingestion_of_one_file_stores_it_once() {
    let (_dir, engine) = sqlite_engine();
    let engine = Arc::new(engine);
    let handles: Vec<_> = (0..6)
        .map(|_| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                engine.ingest_document(
                    DocumentBuilder::new("shared master")
                        .effective(date(2024, 1, 1))
                        .parties("acme", "widget")
                        .build(),
                    vec![ClauseBuilder::new("5.3", "base").build()],
                )
            })
        })
        .collect();
    let reports: Vec<_> = handles
        .into_iter()
        .map(|h| h.join().unwrap().unwrap())
        .collect();
    assert_eq!(reports.iter().filter(|r| !r.skipped).count(), 1);
    assert!(reports.iter().all(|r| r.version_ingest == Some(1)));
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

#[test]
fn queries_report_not_found_for_unknown_family() {
    let engine = memory_engine();
    let err = engine.current(&acme(), "5.3").unwrap_err();
    assert!(matches!(err, LineageError::NotFound { kind: "family", .. }));
    let err = engine
        .history(&FamilySelector::Id("nope".to_string()), "5.3")
        .unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn semantic_section_queries_resolve() {
    let engine = memory_engine();
    engine
        .ingest_document(
            DocumentBuilder::new("master")
                .effective(date(2024, 1, 1))
                .parties("acme", "widget")
                .build(),
            vec![ClauseBuilder::new("semantic:limitation_of_liability", "cap").build()],
        )
        .unwrap();
    let resolved = engine
        .resolve_section(&acme(), "Limitation of Liability")
        .unwrap();
    assert_eq!(resolved.matched, SectionMatch::Semantic);
    let current = engine.current(&acme(), "Limitation of Liability").unwrap();
    assert_eq!(current.composed_text.as_deref(), Some("cap"));

    let unresolved = engine.current(&acme(), "Force Majeure").unwrap_err();
    assert!(unresolved.is_not_found());
}

#[test]
fn as_of_before_first_node_is_not_found() {
    let engine = memory_engine();
    ingest_master(&engine, "base");
    let err = engine.as_of(&acme(), "5.3", date(2023, 6, 1)).unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn change_at_missing_version_is_not_found() {
    let engine = memory_engine();
    ingest_master(&engine, "base");
    let err = engine.change_at_version(&acme(), "5.3", 9).unwrap_err();
    assert!(matches!(err, LineageError::NotFound { kind: "document version", .. }));
}
