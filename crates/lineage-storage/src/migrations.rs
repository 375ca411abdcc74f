//! Schema versioning through a dedicated single-row table.
//!
//! Each version bump is a const SQL string applied inside one transaction.

use rusqlite::{Connection, OptionalExtension, TransactionBehavior};
use tracing::info;

use lineage_core::errors::StorageError;
use lineage_core::LineageResult;

use super::schema::LINEAGE_TABLES_V1;
use crate::to_storage_err;

/// Current schema version. Bump this when adding new migrations.
pub const CURRENT_VERSION: u32 = 1;

/// Schema version recorded in the database; 0 for a fresh file.
pub fn get_schema_version(conn: &Connection) -> LineageResult<u32> {
    let table_exists: bool = conn
        .query_row(
            "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='lineage_schema_version'",
            [],
            |row| row.get(0),
        )
        .map_err(to_storage_err)?;
    if !table_exists {
        return Ok(0);
    }

    let version = conn
        .query_row("SELECT version FROM lineage_schema_version LIMIT 1", [], |row| {
            row.get::<_, u32>(0)
        })
        .optional()
        .map_err(to_storage_err)?;
    Ok(version.unwrap_or(0))
}

fn set_schema_version(conn: &Connection, version: u32) -> rusqlite::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS lineage_schema_version (
            version INTEGER NOT NULL
        ) STRICT;",
    )?;
    conn.execute("DELETE FROM lineage_schema_version", [])?;
    conn.execute(
        "INSERT INTO lineage_schema_version (version) VALUES (?1)",
        rusqlite::params![version],
    )?;
    Ok(())
}

fn apply(conn: &Connection, version: u32, sql: &str) -> LineageResult<()> {
    let failed = |e: rusqlite::Error| StorageError::MigrationFailed {
        version,
        reason: e.to_string(),
    };
    let tx = rusqlite::Transaction::new_unchecked(conn, TransactionBehavior::Immediate)
        .map_err(failed)?;
    tx.execute_batch(sql).map_err(failed)?;
    set_schema_version(&tx, version).map_err(failed)?;
    tx.commit().map_err(failed)?;
    Ok(())
}

/// Run all pending migrations. Returns the version the database ends at.
pub fn migrate(conn: &Connection) -> LineageResult<u32> {
    let current = get_schema_version(conn)?;
    if current >= CURRENT_VERSION {
        return Ok(current);
    }

    if current < 1 {
        info!("migrating lineage schema: 0 → 1 (initial tables)");
        apply(conn, 1, LINEAGE_TABLES_V1)?;
    }

    let final_version = get_schema_version(conn)?;
    info!(from = current, to = final_version, "lineage schema migration complete");
    Ok(final_version)
}
