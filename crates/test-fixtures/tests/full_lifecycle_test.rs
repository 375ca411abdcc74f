//! Full lifecycle: ingest the Acme/Widget master and amendment, then ask
//! every temporal question about the liability cap.

use lineage_core::config::LineageConfig;
use lineage_core::errors::LineageResult;
use lineage_core::models::{
    ChangeAction, DocType, FactValue, FamilySelector, SectionMatch, SectionStatus,
};
use lineage_core::telemetry;
use lineage_core::traits::LineageStorage;
use lineage_storage::{MemoryLineageStorage, SqliteLineageStorage};
use lineage_temporal::{LineageEngine, LineageRuntime};
use test_fixtures::{acme_widget_scenario, date, AMENDED_CAP, MASTER_CAP};

fn ingest_scenario<S: LineageStorage>(engine: &LineageEngine<S>) -> LineageResult<String> {
    let mut family_id = None;
    for doc in acme_widget_scenario() {
        let report = engine.ingest_document(doc.record, doc.clauses)?;
        assert!(!report.skipped);
        assert!(report.sections.is_clean());
        family_id = report.family_id;
    }
    Ok(family_id.expect("scenario documents have parties"))
}

fn run_lifecycle<S: LineageStorage>(engine: &LineageEngine<S>) {
    telemetry::init_tracing("warn", false);
    let family_id = ingest_scenario(engine).unwrap();
    let by_parties = FamilySelector::parties("Acme Corp.", "Widget LLC");
    let by_id = FamilySelector::Id(family_id.clone());

    // Current state
    let current = engine.current(&by_parties, "5.3").unwrap();
    assert_eq!(current.family_id, family_id);
    assert_eq!(current.composed_text.as_deref(), Some(AMENDED_CAP));
    assert_eq!(current.current_effective_ts, Some(date(2024, 6, 1)));
    assert_eq!(current.section.matched, SectionMatch::Exact);

    // History
    let history = engine.history(&by_id, "5.3").unwrap();
    assert_eq!(history.total_versions(), 2);
    assert_eq!(history.entries[0].clause_text, MASTER_CAP);
    assert_eq!(history.entries[0].doc_type, Some(DocType::Master));
    assert_eq!(history.entries[0].doc_version, Some(1));
    assert_eq!(history.entries[1].change_action, Some(ChangeAction::Replace));
    assert_eq!(history.entries[1].doc_version, Some(2));
    let facts = history.entries[1].extracted_facts.as_ref().unwrap();
    assert_eq!(facts.get("cap_amount"), Some(&FactValue::Integer(1_000_000)));

    // Point in time
    let march = engine.as_of(&by_parties, "5.3", date(2024, 3, 1)).unwrap();
    assert_eq!(march.composed_text.as_deref(), Some(MASTER_CAP));
    assert_eq!(march.status, SectionStatus::Active);
    let july = engine.as_of(&by_parties, "5.3", date(2024, 7, 1)).unwrap();
    assert_eq!(july.composed_text.as_deref(), Some(AMENDED_CAP));

    // Per-version changes
    let v2 = engine.change_at_version(&by_id, "5.3", 2).unwrap();
    assert_eq!(v2.doc_type, Some(DocType::Amendment));
    assert_eq!(v2.changes.len(), 1);
    assert_eq!(v2.changes[0].change_action, Some(ChangeAction::Replace));
    assert_eq!(v2.changes[0].modifies_section_id.as_deref(), Some("5.3"));

    let untouched = engine.change_at_version(&by_id, "12.1", 2).unwrap();
    assert!(untouched.changes.is_empty());
    assert!(!untouched.touches_section());

    // Unaffected section keeps the master text
    let termination = engine.current(&by_id, "12.1").unwrap();
    assert_eq!(
        termination.composed_text.as_deref(),
        Some("Either party may terminate on 90 days notice.")
    );
}

#[test]
fn lifecycle_on_memory_store() {
    let engine = LineageEngine::new(MemoryLineageStorage::new(), LineageConfig::default()).unwrap();
    run_lifecycle(&engine);
}

#[test]
fn lifecycle_on_sqlite_store() {
    let dir = tempfile::tempdir().unwrap();
    let storage = SqliteLineageStorage::open(&dir.path().join("lineage.db"), 2).unwrap();
    let engine = LineageEngine::new(storage, LineageConfig::default()).unwrap();
    run_lifecycle(&engine);
}

#[test]
fn lifecycle_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lineage.db");
    let mut config = LineageConfig::default();
    config.storage.db_path = Some(path.to_string_lossy().into_owned());

    let runtime = LineageRuntime::open(config.clone()).unwrap();
    ingest_scenario(runtime.engine().unwrap().as_ref()).unwrap();
    runtime.shutdown().unwrap();

    let reopened = LineageRuntime::open(config).unwrap();
    let engine = reopened.engine().unwrap();
    let current = engine
        .current(&FamilySelector::parties("acme", "widget"), "5.3")
        .unwrap();
    assert_eq!(current.composed_text.as_deref(), Some(AMENDED_CAP));

    // Re-ingesting the same files is a no-op.
    for doc in acme_widget_scenario() {
        assert!(engine.ingest_document(doc.record, doc.clauses).unwrap().skipped);
    }
}

#[test]
fn arrival_order_does_not_change_the_answer() {
    let engine = LineageEngine::new(MemoryLineageStorage::new(), LineageConfig::default()).unwrap();
    let mut docs = acme_widget_scenario();
    docs.reverse();
    for doc in docs {
        engine.ingest_document(doc.record, doc.clauses).unwrap();
    }
    let selector = FamilySelector::parties("acme", "widget");
    let current = engine.current(&selector, "5.3").unwrap();
    assert_eq!(current.composed_text.as_deref(), Some(AMENDED_CAP));

    let v1 = engine.change_at_version(&selector, "5.3", 1).unwrap();
    assert_eq!(v1.doc_type, Some(DocType::Master));
}
