mod lineage_error;
mod recovery;
mod storage_error;

pub use lineage_error::{LineageError, LineageResult};
pub use recovery::RecoveryAction;
pub use storage_error::StorageError;
