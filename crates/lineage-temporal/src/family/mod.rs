pub mod cache;
pub mod resolver;

pub use cache::FamilyCache;
