//! LineageEngine: central orchestrator over a storage port.

use chrono::{DateTime, Utc};
use tracing::info;

use lineage_core::config::LineageConfig;
use lineage_core::errors::{LineageError, LineageResult};
use lineage_core::hashing;
use lineage_core::models::{
    AsOfSection, ClauseRecord, CorrectionReport, CurrentSection, DocumentRecord, Family,
    FamilySectionCurrent, FamilySelector, FactsUpcasterRegistry, IngestionReport,
    MaterializationReport, ResolvedSection, SectionHistory, VersionChanges, VersionStamp,
};
use lineage_core::traits::{LineageReader, LineageStorage, LineageWriter};

use crate::family::{resolver, FamilyCache};
use crate::ingestion;
use crate::locks::FamilyLocks;
use crate::query;
use crate::supersession::materialize;
use crate::versioning;

/// The clause lineage engine.
///
/// Every write for a family runs inside that family's lock and inside one
/// storage transaction. Reads take no engine locks.
pub struct LineageEngine<S: LineageStorage> {
    pub(crate) storage: S,
    pub(crate) config: LineageConfig,
    pub(crate) locks: FamilyLocks,
    pub(crate) families: FamilyCache,
    pub(crate) upcasters: FactsUpcasterRegistry,
}

impl<S: LineageStorage> LineageEngine<S> {
    /// Create an engine over an already-migrated store.
    pub fn new(storage: S, config: LineageConfig) -> LineageResult<Self> {
        config.validate()?;
        let families = FamilyCache::new(config.cache.family_cache_capacity);
        Ok(Self {
            storage,
            config,
            locks: FamilyLocks::new(),
            families,
            upcasters: FactsUpcasterRegistry::with_defaults(),
        })
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn config(&self) -> &LineageConfig {
        &self.config
    }

    pub(crate) fn with_family_write<T, F>(&self, family_id: &str, f: F) -> LineageResult<T>
    where
        F: FnOnce(&mut dyn LineageWriter) -> LineageResult<T>,
    {
        self.locks
            .with_family(family_id, || self.storage.write(f))
    }

    /// One write transaction under the locks of every listed family.
    pub(crate) fn with_families_write<T, F>(&self, family_ids: &[&str], f: F) -> LineageResult<T>
    where
        F: FnOnce(&mut dyn LineageWriter) -> LineageResult<T>,
    {
        self.locks
            .with_families(family_ids, || self.storage.write(f))
    }

    fn resolve_family<R: LineageReader + ?Sized>(
        &self,
        reader: &R,
        selector: &FamilySelector,
    ) -> LineageResult<Family> {
        if let FamilySelector::Parties(a, b) = selector {
            if let Some(family_id) = self.families.get(&hashing::family_keys_hash(a, b)) {
                if let Some(family) = reader.get_family(&family_id)? {
                    return Ok(family);
                }
            }
        }
        resolver::resolve_selector(reader, selector)
    }

    // ── Families ──

    /// Id of the family for the pair, creating it when absent.
    pub fn match_or_create_family(&self, party_a: &str, party_b: &str) -> LineageResult<String> {
        if let Some(family_id) = self.families.get(&hashing::family_keys_hash(party_a, party_b)) {
            return Ok(family_id);
        }
        let family = self
            .storage
            .write(|w| resolver::match_or_create_family(w, party_a, party_b))?;
        self.families
            .insert(&family.family_keys_hash, &family.family_id);
        Ok(family.family_id)
    }

    /// Read-only family lookup.
    pub fn find_family(&self, party_a: &str, party_b: &str) -> LineageResult<Option<Family>> {
        self.storage
            .read(|r| resolver::find_family(r, party_a, party_b))
    }

    // ── Versions ──

    pub fn assign_versions(
        &self,
        doc_id: &str,
        family_id: &str,
        effective_ts: Option<DateTime<Utc>>,
    ) -> LineageResult<VersionStamp> {
        self.with_family_write(family_id, |w| {
            versioning::assign::assign_versions(w, doc_id, family_id, effective_ts)
        })
    }

    /// Change a document's effective date, re-rank its family and refold
    /// every section of the family.
    pub fn correct_effective_date(
        &self,
        doc_id: &str,
        effective_ts: Option<DateTime<Utc>>,
    ) -> LineageResult<CorrectionReport> {
        let family_id = self
            .storage
            .read(|r| r.get_document(doc_id))?
            .ok_or_else(|| LineageError::not_found("document", doc_id))?
            .family_id;
        let correct = |w: &mut dyn LineageWriter| {
            versioning::correction::correct_effective_date(w, doc_id, effective_ts, Utc::now())
        };
        match family_id {
            Some(family_id) => self.with_family_write(&family_id, correct),
            None => self.storage.write(correct),
        }
    }

    // ── Materialization ──

    /// Refold one section. `None` when the section has no nodes.
    pub fn materialize_section(
        &self,
        family_id: &str,
        canonical_section_id: &str,
    ) -> LineageResult<Option<FamilySectionCurrent>> {
        let outcome = self.with_family_write(family_id, |w| {
            materialize::materialize_section(w, family_id, canonical_section_id, Utc::now())
        })?;
        Ok(outcome.into_row())
    }

    /// Refold the given sections of one family.
    pub fn materialize_affected(
        &self,
        family_id: &str,
        section_ids: &[String],
    ) -> LineageResult<MaterializationReport> {
        self.with_family_write(family_id, |w| {
            materialize::materialize_sections(w, family_id, section_ids, Utc::now())
        })
    }

    /// Refold every section of one family.
    pub fn materialize_family(&self, family_id: &str) -> LineageResult<MaterializationReport> {
        self.with_family_write(family_id, |w| {
            if w.get_family(family_id)?.is_none() {
                return Err(LineageError::not_found("family", family_id));
            }
            materialize::materialize_family(w, family_id, Utc::now())
        })
    }

    /// Drop the materialized table and refold every section of every family.
    pub fn rebuild_all(&self) -> LineageResult<MaterializationReport> {
        let now = Utc::now();
        let (cleared, report) = self.storage.write(|w| {
            let cleared = w.clear_current()?;
            let mut report = MaterializationReport::default();
            for family_id in w.list_family_ids()? {
                report.merge(materialize::materialize_family(w, &family_id, now)?);
            }
            Ok((cleared, report))
        })?;
        info!(
            cleared,
            materialized = report.materialized.len(),
            failed = report.failed.len(),
            "rebuilt materialized sections"
        );
        Ok(report)
    }

    // ── Ingestion ──

    pub fn ingest_document(
        &self,
        record: DocumentRecord,
        clauses: Vec<ClauseRecord>,
    ) -> LineageResult<IngestionReport> {
        ingestion::pipeline::ingest_document(self, record, clauses)
    }

    // ── Queries ──

    pub fn resolve_section(
        &self,
        selector: &FamilySelector,
        section_query: &str,
    ) -> LineageResult<ResolvedSection> {
        self.storage.read(|r| {
            let family = self.resolve_family(r, selector)?;
            query::section::resolve(
                r,
                &family.family_id,
                section_query,
                &self.config.query.semantic_prefix,
            )
        })
    }

    pub fn current(
        &self,
        selector: &FamilySelector,
        section_query: &str,
    ) -> LineageResult<CurrentSection> {
        self.storage.read(|r| {
            let family = self.resolve_family(r, selector)?;
            query::current::execute_current(
                r,
                &family,
                section_query,
                &self.config.query.semantic_prefix,
            )
        })
    }

    pub fn history(
        &self,
        selector: &FamilySelector,
        section_query: &str,
    ) -> LineageResult<SectionHistory> {
        self.storage.read(|r| {
            let family = self.resolve_family(r, selector)?;
            query::history::execute_history(
                r,
                &family,
                section_query,
                &self.config.query.semantic_prefix,
            )
        })
    }

    pub fn change_at_version(
        &self,
        selector: &FamilySelector,
        section_query: &str,
        version_timeline: u32,
    ) -> LineageResult<VersionChanges> {
        self.storage.read(|r| {
            let family = self.resolve_family(r, selector)?;
            query::changes::execute_change_at_version(
                r,
                &family,
                section_query,
                version_timeline,
                &self.config.query.semantic_prefix,
            )
        })
    }

    pub fn as_of(
        &self,
        selector: &FamilySelector,
        section_query: &str,
        as_of: DateTime<Utc>,
    ) -> LineageResult<AsOfSection> {
        self.storage.read(|r| {
            let family = self.resolve_family(r, selector)?;
            query::as_of::execute_as_of(
                r,
                &family,
                section_query,
                as_of,
                &self.config.query.semantic_prefix,
            )
        })
    }
}
