//! Result cache.
//!
//! Keyed by the exact question text — no normalization, so "Library
//! hours?" and "library hours?" are different entries. Entries live for
//! the process lifetime but the table is capacity-bounded: once full,
//! cold entries are evicted. Eviction only costs a recomputation; it can
//! never change an answer, because only results above the confidence
//! threshold are ever written.

use moka::sync::Cache;

use super::engine::QueryResult;

#[derive(Clone)]
pub struct ResponseCache {
    inner: Cache<String, QueryResult>,
}

impl ResponseCache {
    pub fn new(capacity: u64) -> Self {
        Self {
            inner: Cache::builder().max_capacity(capacity).build(),
        }
    }

    pub fn get(&self, question: &str) -> Option<QueryResult> {
        self.inner.get(question)
    }

    pub fn insert(&self, question: String, result: QueryResult) {
        self.inner.insert(question, result);
    }

    #[cfg(test)]
    fn entry_count(&self) -> u64 {
        self.inner.run_pending_tasks();
        self.inner.entry_count()
    }
}
