pub mod assign;
pub mod correction;
