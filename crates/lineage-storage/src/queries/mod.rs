//! Raw SQL operations, one module per table.

pub mod clause_ops;
pub mod current_ops;
pub mod document_ops;
pub mod family_ops;
