//! ConnectionPool: one writer plus N read-only readers with round-robin selection.
//!
//! The only place in this crate that holds `Mutex<Connection>`.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use rusqlite::{Connection, OpenFlags};

use lineage_core::errors::StorageError;
use lineage_core::{LineageError, LineageResult};

use crate::pragmas;

const DEFAULT_READ_POOL_SIZE: usize = 2;

type Slot = Mutex<Option<Connection>>;

pub struct ConnectionPool {
    writer: Slot,
    readers: Vec<Slot>,
    read_index: AtomicUsize,
}

impl ConnectionPool {
    /// Open a file-backed pool. A `read_pool_size` of 0 uses the default.
    pub fn open(path: &Path, read_pool_size: usize) -> LineageResult<Self> {
        let pool_size = if read_pool_size == 0 {
            DEFAULT_READ_POOL_SIZE
        } else {
            read_pool_size
        };

        let writer = Connection::open(path).map_err(|e| {
            LineageError::Config(format!("failed to open {} for writing: {e}", path.display()))
        })?;
        pragmas::configure_connection(&writer)?;

        let mut readers = Vec::with_capacity(pool_size);
        for i in 0..pool_size {
            let reader = Connection::open_with_flags(
                path,
                OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )
            .map_err(|e| LineageError::Config(format!("failed to open reader {i}: {e}")))?;
            pragmas::configure_readonly_connection(&reader)?;
            readers.push(Mutex::new(Some(reader)));
        }

        Ok(Self {
            writer: Mutex::new(Some(writer)),
            readers,
            read_index: AtomicUsize::new(0),
        })
    }

    /// A single private in-memory connection; reads go through the writer.
    pub fn open_in_memory() -> LineageResult<Self> {
        let writer = Connection::open_in_memory()
            .map_err(|e| LineageError::Config(format!("failed to open in-memory database: {e}")))?;
        pragmas::configure_connection(&writer)?;

        Ok(Self {
            writer: Mutex::new(Some(writer)),
            readers: Vec::new(),
            read_index: AtomicUsize::new(0),
        })
    }

    pub fn with_writer<F, T>(&self, f: F) -> LineageResult<T>
    where
        F: FnOnce(&Connection) -> LineageResult<T>,
    {
        let guard = lock(&self.writer, "writer")?;
        let conn = guard.as_ref().ok_or_else(closed)?;
        f(conn)
    }

    /// Round-robin over the readers; falls back to the writer when there are none.
    pub fn with_reader<F, T>(&self, f: F) -> LineageResult<T>
    where
        F: FnOnce(&Connection) -> LineageResult<T>,
    {
        if self.readers.is_empty() {
            return self.with_writer(f);
        }

        let index = self.read_index.fetch_add(1, Ordering::Relaxed) % self.readers.len();
        let guard = lock(&self.readers[index], "reader")?;
        let conn = guard.as_ref().ok_or_else(closed)?;
        f(conn)
    }

    pub fn reader_count(&self) -> usize {
        self.readers.len()
    }

    /// Close every connection. Later calls fail with `Unavailable`.
    pub fn close(&self) -> LineageResult<()> {
        for slot in self.readers.iter().chain(std::iter::once(&self.writer)) {
            let mut guard = lock(slot, "pool")?;
            if let Some(conn) = guard.take() {
                conn.close().map_err(|(_, e)| crate::to_storage_err(e))?;
            }
        }
        Ok(())
    }
}

fn lock<'a>(slot: &'a Slot, role: &str) -> LineageResult<MutexGuard<'a, Option<Connection>>> {
    slot.lock()
        .map_err(|e| StorageError::LockPoisoned(format!("{role} connection: {e}")).into())
}

fn closed() -> LineageError {
    LineageError::Unavailable {
        reason: "storage has been shut down".to_string(),
    }
}
