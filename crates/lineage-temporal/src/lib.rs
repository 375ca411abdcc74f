//! # lineage-temporal
//!
//! The clause lineage engine. Groups documents into families, ranks them
//! by arrival and by effective date, folds each section's clause nodes
//! into its current text, and answers temporal queries over the result.

pub mod engine;
pub mod family;
pub mod ingestion;
pub mod locks;
pub mod ordering;
pub mod query;
pub mod runtime;
pub mod supersession;
pub mod versioning;

pub use engine::LineageEngine;
pub use runtime::LineageRuntime;
