//! # lineage-core
//!
//! Foundation types for the clause lineage engine.
//! Content-addressed identity, party normalization, the data model
//! (families, documents, clause nodes, materialized sections), error and
//! recovery types, configuration, and the storage port traits that every
//! storage adapter implements.

pub mod config;
pub mod errors;
pub mod hashing;
pub mod models;
pub mod normalize;
pub mod telemetry;
pub mod traits;

pub use config::LineageConfig;
pub use errors::{LineageError, LineageResult};
