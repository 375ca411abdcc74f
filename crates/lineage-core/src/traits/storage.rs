//! Storage port for the lineage engine.
//!
//! The engine never touches a connection directly. It asks the port for a
//! read scope or a write scope; a write scope is one atomic transaction
//! that commits when the closure returns `Ok` and rolls back otherwise.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::errors::LineageResult;
use crate::models::{ClauseNode, ContractDocument, Family, FamilySectionCurrent};

/// Health of a storage adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageHealth {
    pub connected: bool,
    pub wal_mode: bool,
    pub schema_version: u32,
}

/// Read operations available inside any scope.
pub trait LineageReader {
    // ── Families ──

    fn get_family(&self, family_id: &str) -> LineageResult<Option<Family>>;

    fn find_family_by_keys_hash(&self, family_keys_hash: &str) -> LineageResult<Option<Family>>;

    /// All family ids, sorted.
    fn list_family_ids(&self) -> LineageResult<Vec<String>>;

    // ── Documents ──

    fn get_document(&self, doc_id: &str) -> LineageResult<Option<ContractDocument>>;

    fn find_document_by_file_hash(&self, file_hash: &str)
        -> LineageResult<Option<ContractDocument>>;

    /// Documents of a family in arrival order.
    fn documents_in_family(&self, family_id: &str) -> LineageResult<Vec<ContractDocument>>;

    fn document_at_timeline_version(
        &self,
        family_id: &str,
        version_timeline: u32,
    ) -> LineageResult<Option<ContractDocument>>;

    // ── Clause nodes ──

    /// Nodes of one (family, section) key in arrival order.
    fn nodes_for_section(
        &self,
        family_id: &str,
        canonical_section_id: &str,
    ) -> LineageResult<Vec<ClauseNode>>;

    /// Nodes one document contributed to a section, in arrival order.
    fn nodes_for_document_section(
        &self,
        doc_id: &str,
        canonical_section_id: &str,
    ) -> LineageResult<Vec<ClauseNode>>;

    /// Distinct section ids with at least one node in the family, sorted.
    fn section_ids_for_family(&self, family_id: &str) -> LineageResult<Vec<String>>;

    /// Distinct section ids a document contributed to, sorted.
    fn section_ids_for_document(&self, doc_id: &str) -> LineageResult<Vec<String>>;

    // ── Materialized state ──

    fn get_current(
        &self,
        family_id: &str,
        canonical_section_id: &str,
    ) -> LineageResult<Option<FamilySectionCurrent>>;

    fn current_rows_for_family(&self, family_id: &str)
        -> LineageResult<Vec<FamilySectionCurrent>>;
}

/// Write operations, only available inside a write scope.
pub trait LineageWriter: LineageReader {
    /// Fails with `ConflictRace` when the keys hash is already taken.
    fn insert_family(&mut self, family: &Family) -> LineageResult<()>;

    /// Insert, or update the mutable fields of an existing document.
    /// `created_at` and the arrival sequence of an existing row are kept.
    fn upsert_document(&mut self, document: &ContractDocument) -> LineageResult<ContractDocument>;

    /// Returns `true` when the node was new. An existing node keeps its
    /// `created_at` and arrival sequence.
    fn upsert_clause_node(&mut self, node: &ClauseNode) -> LineageResult<bool>;

    /// Set `effective_ts` on every node of `doc_id` that declared no date
    /// of its own. Returns the number of nodes whose date changed.
    fn set_inherited_effective_ts(
        &mut self,
        doc_id: &str,
        effective_ts: Option<DateTime<Utc>>,
    ) -> LineageResult<usize>;

    /// Move every node of `doc_id` into `family_id`. Returns the number moved.
    fn move_document_nodes(&mut self, doc_id: &str, family_id: &str) -> LineageResult<usize>;

    fn upsert_current(&mut self, row: &FamilySectionCurrent) -> LineageResult<()>;

    /// Returns `true` when a row was removed.
    fn delete_current(&mut self, family_id: &str, canonical_section_id: &str)
        -> LineageResult<bool>;

    /// Drop every materialized row. Returns the number removed.
    fn clear_current(&mut self) -> LineageResult<usize>;
}

/// A transactional lineage store.
pub trait LineageStorage: Send + Sync {
    fn read<T, F>(&self, f: F) -> LineageResult<T>
    where
        F: FnOnce(&dyn LineageReader) -> LineageResult<T>;

    /// Run `f` in one transaction. Nothing is persisted unless `f` returns `Ok`.
    fn write<T, F>(&self, f: F) -> LineageResult<T>
    where
        F: FnOnce(&mut dyn LineageWriter) -> LineageResult<T>;

    /// Create tables and run pending schema migrations.
    fn migrate(&self) -> LineageResult<()>;

    fn health_check(&self) -> LineageResult<StorageHealth>;

    /// Release connections. Later calls fail.
    fn shutdown(&self) -> LineageResult<()>;
}

impl<S: LineageStorage + ?Sized> LineageStorage for Arc<S> {
    fn read<T, F>(&self, f: F) -> LineageResult<T>
    where
        F: FnOnce(&dyn LineageReader) -> LineageResult<T>,
    {
        (**self).read(f)
    }

    fn write<T, F>(&self, f: F) -> LineageResult<T>
    where
        F: FnOnce(&mut dyn LineageWriter) -> LineageResult<T>,
    {
        (**self).write(f)
    }

    fn migrate(&self) -> LineageResult<()> {
        (**self).migrate()
    }

    fn health_check(&self) -> LineageResult<StorageHealth> {
        (**self).health_check()
    }

    fn shutdown(&self) -> LineageResult<()> {
        (**self).shutdown()
    }
}
