//! SQLite implementation of the lineage storage port.

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use tracing::{debug, info};

use lineage_core::config::StorageConfig;
use lineage_core::models::{ClauseNode, ContractDocument, Family, FamilySectionCurrent};
use lineage_core::traits::{LineageReader, LineageStorage, LineageWriter, StorageHealth};
use lineage_core::{LineageError, LineageResult};

use crate::migrations;
use crate::pool::ConnectionPool;
use crate::pragmas;
use crate::queries::{clause_ops, current_ops, document_ops, family_ops};
use crate::to_storage_err;

pub struct SqliteLineageStorage {
    pool: ConnectionPool,
}

impl SqliteLineageStorage {
    /// Open a file-backed store and bring its schema up to date.
    pub fn open(path: &Path, read_pool_size: usize) -> LineageResult<Self> {
        let storage = Self {
            pool: ConnectionPool::open(path, read_pool_size)?,
        };
        storage.migrate()?;
        info!(path = %path.display(), readers = storage.pool.reader_count(), "opened lineage store");
        Ok(storage)
    }

    /// Open a private in-memory SQLite store.
    pub fn open_in_memory() -> LineageResult<Self> {
        let storage = Self {
            pool: ConnectionPool::open_in_memory()?,
        };
        storage.migrate()?;
        Ok(storage)
    }

    pub fn from_config(config: &StorageConfig) -> LineageResult<Self> {
        match config.db_path.as_deref() {
            Some(path) => Self::open(Path::new(path), config.read_pool_size),
            None => Self::open_in_memory(),
        }
    }

    pub fn schema_version(&self) -> LineageResult<u32> {
        self.pool.with_reader(migrations::get_schema_version)
    }
}

impl LineageStorage for SqliteLineageStorage {
    fn read<T, F>(&self, f: F) -> LineageResult<T>
    where
        F: FnOnce(&dyn LineageReader) -> LineageResult<T>,
    {
        self.pool.with_reader(|conn| {
            // Deferred transaction for a consistent snapshot; dropped (rolled back) on exit.
            let tx = Transaction::new_unchecked(conn, TransactionBehavior::Deferred)
                .map_err(to_storage_err)?;
            let session = SqliteSession::new(&tx);
            f(&session)
        })
    }

    fn write<T, F>(&self, f: F) -> LineageResult<T>
    where
        F: FnOnce(&mut dyn LineageWriter) -> LineageResult<T>,
    {
        self.pool.with_writer(|conn| {
            let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)
                .map_err(to_storage_err)?;
            let value = {
                let mut session = SqliteSession::new(&tx);
                f(&mut session)?
            };
            tx.commit().map_err(to_storage_err)?;
            Ok(value)
        })
    }

    fn migrate(&self) -> LineageResult<()> {
        let version = self.pool.with_writer(migrations::migrate)?;
        debug!(version, "lineage schema ready");
        Ok(())
    }

    fn health_check(&self) -> LineageResult<StorageHealth> {
        self.pool.with_writer(|conn| {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
                .map_err(to_storage_err)?;
            Ok(StorageHealth {
                connected: true,
                wal_mode: pragmas::is_wal(conn)?,
                schema_version: migrations::get_schema_version(conn)?,
            })
        })
    }

    fn shutdown(&self) -> LineageResult<()> {
        self.pool.close()?;
        info!("lineage store closed");
        Ok(())
    }
}

/// One read or write scope over a single connection.
pub struct SqliteSession<'c> {
    conn: &'c Connection,
}

impl<'c> SqliteSession<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }
}

impl LineageReader for SqliteSession<'_> {
    fn get_family(&self, family_id: &str) -> LineageResult<Option<Family>> {
        family_ops::get_family(self.conn, family_id)
    }

    fn find_family_by_keys_hash(&self, family_keys_hash: &str) -> LineageResult<Option<Family>> {
        family_ops::find_by_keys_hash(self.conn, family_keys_hash)
    }

    fn list_family_ids(&self) -> LineageResult<Vec<String>> {
        family_ops::list_family_ids(self.conn)
    }

    fn get_document(&self, doc_id: &str) -> LineageResult<Option<ContractDocument>> {
        document_ops::get_document(self.conn, doc_id)
    }

    fn find_document_by_file_hash(
        &self,
        file_hash: &str,
    ) -> LineageResult<Option<ContractDocument>> {
        document_ops::find_by_file_hash(self.conn, file_hash)
    }

    fn documents_in_family(&self, family_id: &str) -> LineageResult<Vec<ContractDocument>> {
        document_ops::documents_in_family(self.conn, family_id)
    }

    fn document_at_timeline_version(
        &self,
        family_id: &str,
        version_timeline: u32,
    ) -> LineageResult<Option<ContractDocument>> {
        document_ops::document_at_timeline_version(self.conn, family_id, version_timeline)
    }

    fn nodes_for_section(
        &self,
        family_id: &str,
        canonical_section_id: &str,
    ) -> LineageResult<Vec<ClauseNode>> {
        clause_ops::nodes_for_section(self.conn, family_id, canonical_section_id)
    }

    fn nodes_for_document_section(
        &self,
        doc_id: &str,
        canonical_section_id: &str,
    ) -> LineageResult<Vec<ClauseNode>> {
        clause_ops::nodes_for_document_section(self.conn, doc_id, canonical_section_id)
    }

    fn section_ids_for_family(&self, family_id: &str) -> LineageResult<Vec<String>> {
        clause_ops::section_ids_for_family(self.conn, family_id)
    }

    fn section_ids_for_document(&self, doc_id: &str) -> LineageResult<Vec<String>> {
        clause_ops::section_ids_for_document(self.conn, doc_id)
    }

    fn get_current(
        &self,
        family_id: &str,
        canonical_section_id: &str,
    ) -> LineageResult<Option<FamilySectionCurrent>> {
        current_ops::get_current(self.conn, family_id, canonical_section_id)
    }

    fn current_rows_for_family(
        &self,
        family_id: &str,
    ) -> LineageResult<Vec<FamilySectionCurrent>> {
        current_ops::current_rows_for_family(self.conn, family_id)
    }
}

impl LineageWriter for SqliteSession<'_> {
    fn insert_family(&mut self, family: &Family) -> LineageResult<()> {
        family_ops::insert_family(self.conn, family)
    }

    fn upsert_document(&mut self, document: &ContractDocument) -> LineageResult<ContractDocument> {
        document_ops::upsert_document(self.conn, document)?;
        document_ops::get_document(self.conn, &document.doc_id)?.ok_or_else(|| {
            LineageError::IntegrityViolation(format!(
                "document {} missing right after upsert",
                document.doc_id
            ))
        })
    }

    fn upsert_clause_node(&mut self, node: &ClauseNode) -> LineageResult<bool> {
        clause_ops::upsert_clause_node(self.conn, node)
    }

    fn set_inherited_effective_ts(
        &mut self,
        doc_id: &str,
        effective_ts: Option<DateTime<Utc>>,
    ) -> LineageResult<usize> {
        clause_ops::set_inherited_effective_ts(self.conn, doc_id, effective_ts.as_ref())
    }

    fn move_document_nodes(&mut self, doc_id: &str, family_id: &str) -> LineageResult<usize> {
        clause_ops::move_document_nodes(self.conn, doc_id, family_id)
    }

    fn upsert_current(&mut self, row: &FamilySectionCurrent) -> LineageResult<()> {
        current_ops::upsert_current(self.conn, row)
    }

    fn delete_current(
        &mut self,
        family_id: &str,
        canonical_section_id: &str,
    ) -> LineageResult<bool> {
        current_ops::delete_current(self.conn, family_id, canonical_section_id)
    }

    fn clear_current(&mut self) -> LineageResult<usize> {
        current_ops::clear_current(self.conn)
    }
}
