/// Storage adapter errors.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("sqlite error: {message}")]
    Sqlite { message: String },

    #[error("database busy: {message}")]
    Busy { message: String },

    #[error("lock poisoned: {0}")]
    LockPoisoned(String),

    #[error("migration v{version:03} failed: {reason}")]
    MigrationFailed { version: u32, reason: String },

    #[error("corrupt column {column}: {reason}")]
    CorruptColumn { column: String, reason: String },
}
