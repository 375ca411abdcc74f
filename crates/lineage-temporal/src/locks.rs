//! Per-family critical sections.
//!
//! Version assignment and materialization for one family run under that
//! family's mutex; different families proceed in parallel.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use dashmap::DashMap;

#[derive(Default)]
pub struct FamilyLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl FamilyLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, family_id: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(family_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .value()
            .clone()
    }

    /// Run `f` while holding the lock for `family_id`.
    ///
    /// A lock poisoned by a panicking holder is recovered: the guarded
    /// state lives in storage, where the failed transaction rolled back.
    pub fn with_family<T>(&self, family_id: &str, f: impl FnOnce() -> T) -> T {
        self.with_families(&[family_id], f)
    }

    /// Run `f` while holding the locks of every listed family.
    ///
    /// Locks are taken in sorted id order so two callers naming the same
    /// families cannot deadlock. Duplicates are locked once.
    pub fn with_families<T>(&self, family_ids: &[&str], f: impl FnOnce() -> T) -> T {
        let mut ids = family_ids.to_vec();
        ids.sort_unstable();
        ids.dedup();
        let locks: Vec<Arc<Mutex<()>>> = ids.iter().map(|id| self.lock_for(id)).collect();
        let _guards: Vec<MutexGuard<'_, ()>> = locks
            .iter()
            .map(|lock| lock.lock().unwrap_or_else(PoisonError::into_inner))
            .collect();
        f()
    }

    /// Number of families that have been locked at least once.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
