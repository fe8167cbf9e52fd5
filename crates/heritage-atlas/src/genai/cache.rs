//! Per-key memoization of generation results.
//!
//! Ensures at-most-once submission per logical key: the first caller's
//! factory creates the underlying future, concurrent callers for the same key
//! share the one in-flight computation, and resolved values replay instantly
//! for the rest of the session. Process-wide, unbounded, no TTL — detail data
//! is session-immutable and the visited working set is small.

use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;
use futures::future::{BoxFuture, Shared};
use futures::FutureExt;

pub type SharedResult<T> = Shared<BoxFuture<'static, T>>;

pub struct ResponseCache<T: Clone> {
    entries: Arc<DashMap<String, SharedResult<T>>>,
}

impl<T: Clone> Clone for ResponseCache<T> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
        }
    }
}

impl<T: Clone> Default for ResponseCache<T> {
    fn default() -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> ResponseCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the stored future for `key`, creating it with `factory` exactly
    /// once. Pending entries are shared unchanged, so all callers observe the
    /// identical eventual value.
    pub fn get_or_create<F, Fut>(&self, key: &str, factory: F) -> SharedResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        self.entries
            .entry(key.to_string())
            .or_insert_with(|| factory().boxed().shared())
            .value()
            .clone()
    }

    /// Drop a key so a later call can retry. Safety net for a request whose
    /// result channel died before resolving; the queue's fallback path makes
    /// this unreachable in normal operation.
    pub fn evict(&self, key: &str) {
        self.entries.remove(key);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
