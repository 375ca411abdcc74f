//! RecoveryAction enum: what to do when a lineage operation fails.

use std::fmt;

use super::{LineageError, StorageError};

/// Recommended recovery action for a failed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryAction {
    /// Retry the operation (transient failure like SQLITE_BUSY).
    Retry,
    /// Fall back to an empty or degraded result.
    Fallback,
    /// Escalate to the caller. This error cannot be handled silently.
    Escalate,
    /// Ignore the error. The value was already normalized.
    Ignore,
}

impl RecoveryAction {
    /// Determine the recommended recovery action for a LineageError.
    pub fn for_error(error: &LineageError) -> Self {
        match error {
            // Expected misses surface as empty results
            LineageError::NotFound { .. } => Self::Fallback,
            LineageError::Unavailable { .. } => Self::Fallback,

            // Someone else created the row first: re-query
            LineageError::ConflictRace { .. } => Self::Retry,

            // Already normalized to the safest default
            LineageError::InvalidEnum { .. } => Self::Ignore,

            // Broken invariants and bad configuration must be fixed upstream
            LineageError::IntegrityViolation(_) => Self::Escalate,
            LineageError::InvalidInput(_) => Self::Escalate,
            LineageError::Config(_) => Self::Escalate,
            LineageError::Serialization(_) => Self::Escalate,

            LineageError::Storage(StorageError::Busy { .. }) => Self::Retry,
            LineageError::Storage(StorageError::MigrationFailed { .. }) => Self::Escalate,
            LineageError::Storage(StorageError::CorruptColumn { .. }) => Self::Escalate,
            LineageError::Storage(_) => Self::Retry,
        }
    }
}

impl fmt::Display for RecoveryAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Retry => write!(f, "Retry"),
            Self::Fallback => write!(f, "Fallback"),
            Self::Escalate => write!(f, "Escalate"),
            Self::Ignore => write!(f, "Ignore"),
        }
    }
}
