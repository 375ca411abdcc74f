//! SQLite PRAGMA configuration for lineage connections.
//! Must be called on every connection immediately after opening.

use rusqlite::Connection;

use lineage_core::LineageResult;

use crate::to_storage_err;

const BASE_PRAGMAS: &str = "
    PRAGMA journal_mode = WAL;
    PRAGMA synchronous = NORMAL;
    PRAGMA foreign_keys = ON;
    PRAGMA busy_timeout = 5000;
    PRAGMA cache_size = -8000;
    PRAGMA mmap_size = 268435456;
    PRAGMA temp_store = MEMORY;
";

/// Configure the writer connection.
///
/// WAL lets readers proceed during a write; `busy_timeout` bounds how long
/// a second writer waits for the lock instead of blocking indefinitely.
pub fn configure_connection(conn: &Connection) -> LineageResult<()> {
    conn.execute_batch(BASE_PRAGMAS).map_err(to_storage_err)
}

/// Same PRAGMAs plus `query_only = ON`.
pub fn configure_readonly_connection(conn: &Connection) -> LineageResult<()> {
    conn.execute_batch(BASE_PRAGMAS).map_err(to_storage_err)?;
    conn.execute_batch("PRAGMA query_only = ON;")
        .map_err(to_storage_err)
}

/// True when the connection journals in WAL mode.
pub fn is_wal(conn: &Connection) -> LineageResult<bool> {
    let mode: String = conn
        .pragma_query_value(None, "journal_mode", |row| row.get(0))
        .map_err(to_storage_err)?;
    Ok(mode.eq_ignore_ascii_case("wal"))
}
