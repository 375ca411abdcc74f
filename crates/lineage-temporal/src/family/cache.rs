//! In-memory family-key → family-id cache.
//!
//! Families are never deleted, so an entry never goes stale. Entries are
//! only inserted after the creating transaction committed.

use moka::sync::Cache;

pub struct FamilyCache {
    inner: Cache<String, String>,
}

impl FamilyCache {
    pub fn new(capacity: u64) -> Self {
        Self {
            inner: Cache::new(capacity),
        }
    }

    pub fn get(&self, family_keys_hash: &str) -> Option<String> {
        self.inner.get(family_keys_hash)
    }

    pub fn insert(&self, family_keys_hash: &str, family_id: &str) {
        self.inner
            .insert(family_keys_hash.to_string(), family_id.to_string());
    }
}
