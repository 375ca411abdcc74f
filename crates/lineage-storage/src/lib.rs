//! # lineage-storage
//!
//! Storage adapters for the clause lineage engine.
//! `SqliteLineageStorage`: single write connection + read pool (WAL mode),
//! versioned migrations, one `BEGIN IMMEDIATE` transaction per write scope.
//! `MemoryLineageStorage`: copy-on-write fake with the same semantics.

pub mod backend;
pub mod codec;
pub mod memory;
pub mod migrations;
pub mod pool;
pub mod pragmas;
pub mod queries;
pub mod schema;
pub mod sqlite;

pub use backend::StorageBackend;
pub use memory::MemoryLineageStorage;
pub use sqlite::SqliteLineageStorage;

use lineage_core::errors::StorageError;
use lineage_core::LineageError;
use rusqlite::ErrorCode;

/// Convert a rusqlite error into a `LineageError::Storage`.
pub fn to_storage_err(err: rusqlite::Error) -> LineageError {
    let storage = match &err {
        rusqlite::Error::SqliteFailure(e, _)
            if matches!(e.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked) =>
        {
            StorageError::Busy {
                message: err.to_string(),
            }
        }
        _ => StorageError::Sqlite {
            message: err.to_string(),
        },
    };
    LineageError::Storage(storage)
}

/// True for UNIQUE / PRIMARY KEY constraint failures.
pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(e, _) => {
            e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
        }
        _ => false,
    }
}
