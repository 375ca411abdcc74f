use super::StorageError;

/// Top-level error type for the clause lineage engine.
/// Storage adapters convert their native errors into this via `From` impls.
#[derive(Debug, thiserror::Error)]
pub enum LineageError {
    /// Expected miss: unknown family, section, document or version.
    #[error("{kind} not found: {key}")]
    NotFound { kind: &'static str, key: String },

    /// Unique-key collision from a concurrent create. Callers re-query.
    #[error("conflicting insert on {entity}: {key}")]
    ConflictRace { entity: &'static str, key: String },

    /// Out-of-range enumeration value from upstream extraction.
    #[error("invalid {field} value: {value}")]
    InvalidEnum { field: &'static str, value: String },

    /// A broken invariant. Aborts the enclosing transaction.
    #[error("integrity violation: {0}")]
    IntegrityViolation(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("lineage runtime unavailable: {reason}")]
    Unavailable { reason: String },
}

impl LineageError {
    pub fn not_found(kind: &'static str, key: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            key: key.into(),
        }
    }

    /// True for the expected "nothing there" outcome.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// True when the enclosing transaction must be aborted.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::IntegrityViolation(_))
    }
}

/// Convenience type alias.
pub type LineageResult<T> = Result<T, LineageError>;
