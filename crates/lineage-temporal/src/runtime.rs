//! LineageRuntime: owns the storage backend and engine for one process.

use std::sync::{Arc, RwLock};

use tracing::info;

use lineage_core::config::LineageConfig;
use lineage_core::errors::{LineageError, LineageResult, StorageError};
use lineage_core::traits::{LineageStorage, StorageHealth};
use lineage_storage::StorageBackend;

use crate::engine::LineageEngine;

/// Constructed context replacing process-wide singletons.
///
/// `open` builds the storage backend from configuration, runs migrations
/// and wires the engine. After `shutdown` every accessor fails with
/// `LineageError::Unavailable`.
pub struct LineageRuntime {
    engine: RwLock<Option<Arc<LineageEngine<StorageBackend>>>>,
}

impl LineageRuntime {
    pub fn open(config: LineageConfig) -> LineageResult<Self> {
        config.validate()?;
        let backend = StorageBackend::open(&config.storage)?;
        backend.migrate()?;
        let kind = backend.kind();
        let engine = LineageEngine::new(backend, config)?;
        info!(backend = kind, "lineage runtime opened");
        Ok(Self {
            engine: RwLock::new(Some(Arc::new(engine))),
        })
    }

    /// The engine, or `Unavailable` once shut down.
    pub fn engine(&self) -> LineageResult<Arc<LineageEngine<StorageBackend>>> {
        let guard = self
            .engine
            .read()
            .map_err(|e| StorageError::LockPoisoned(e.to_string()))?;
        guard.clone().ok_or_else(|| LineageError::Unavailable {
            reason: "runtime has been shut down".to_string(),
        })
    }

    pub fn is_available(&self) -> bool {
        self.engine.read().map(|g| g.is_some()).unwrap_or(false)
    }

    pub fn health_check(&self) -> LineageResult<StorageHealth> {
        self.engine()?.storage().health_check()
    }

    /// Release the store. Idempotent.
    pub fn shutdown(&self) -> LineageResult<()> {
        let taken = self
            .engine
            .write()
            .map_err(|e| StorageError::LockPoisoned(e.to_string()))?
            .take();
        if let Some(engine) = taken {
            engine.storage().shutdown()?;
            info!("lineage runtime shut down");
        }
        Ok(())
    }
}
