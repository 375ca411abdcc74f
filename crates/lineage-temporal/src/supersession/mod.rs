pub mod fold;
pub mod materialize;

pub use fold::{fold_section, FoldedSection};
pub use materialize::MaterializeOutcome;
