pub mod as_of;
pub mod changes;
pub mod current;
pub mod history;
pub mod section;
