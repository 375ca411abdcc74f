mod storage;

pub use storage::{LineageReader, LineageStorage, LineageWriter, StorageHealth};
