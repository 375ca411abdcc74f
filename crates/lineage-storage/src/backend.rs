//! Runtime-selected storage backend.

use lineage_core::config::StorageConfig;
use lineage_core::traits::{LineageReader, LineageStorage, LineageWriter, StorageHealth};
use lineage_core::LineageResult;

use crate::memory::MemoryLineageStorage;
use crate::sqlite::SqliteLineageStorage;

/// Either adapter behind one concrete type, chosen from configuration.
pub enum StorageBackend {
    Sqlite(SqliteLineageStorage),
    Memory(MemoryLineageStorage),
}

impl StorageBackend {
    /// SQLite when `db_path` is set, otherwise the in-memory adapter.
    pub fn open(config: &StorageConfig) -> LineageResult<Self> {
        match config.db_path {
            Some(_) => Ok(Self::Sqlite(SqliteLineageStorage::from_config(config)?)),
            None => Ok(Self::Memory(MemoryLineageStorage::new())),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Sqlite(_) => "sqlite",
            Self::Memory(_) => "memory",
        }
    }
}

impl LineageStorage for StorageBackend {
    fn read<T, F>(&self, f: F) -> LineageResult<T>
    where
        F: FnOnce(&dyn LineageReader) -> LineageResult<T>,
    {
        match self {
            Self::Sqlite(s) => s.read(f),
            Self::Memory(m) => m.read(f),
        }
    }

    fn write<T, F>(&self, f: F) -> LineageResult<T>
    where
        F: FnOnce(&mut dyn LineageWriter) -> LineageResult<T>,
    {
        match self {
            Self::Sqlite(s) => s.write(f),
            Self::Memory(m) => m.write(f),
        }
    }

    fn migrate(&self) -> LineageResult<()> {
        match self {
            Self::Sqlite(s) => s.migrate(),
            Self::Memory(m) => m.migrate(),
        }
    }

    fn health_check(&self) -> LineageResult<StorageHealth> {
        match self {
            Self::Sqlite(s) => s.health_check(),
            Self::Memory(m) => m.health_check(),
        }
    }

    fn shutdown(&self) -> LineageResult<()> {
        match self {
            Self::Sqlite(s) => s.shutdown(),
            Self::Memory(m) => m.shutdown(),
        }
    }
}
