//! A concurrent index keyed by [`KeyPath`].
//!
//! Backed by a sharded `DashMap`, so registrations from application threads
//! only contend with each other on the same shard. [`KeyIndex::range`]
//! copies the entries out before visiting them, which keeps callbacks off
//! the shard locks and lets inserts proceed while a traversal runs.

use std::sync::Arc;

use dashmap::DashMap;

use crate::key::KeyPath;

/// Concurrency-safe mapping from key paths to shared values.
#[derive(Debug)]
pub struct KeyIndex<V: ?Sized> {
    entries: DashMap<KeyPath, Arc<V>>,
}

impl<V: ?Sized> KeyIndex<V> {
    /// Create an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Insert or replace the value at `key`, returning the previous one.
    #[expect(
        clippy::must_use_candidate,
        reason = "callers replacing an entry rarely need the old value"
    )]
    pub fn store(&self, key: KeyPath, value: Arc<V>) -> Option<Arc<V>> {
        self.entries.insert(key, value)
    }

    /// Load the value at `key`.
    #[must_use]
    pub fn load(&self, key: &KeyPath) -> Option<Arc<V>> {
        self.entries.get(key).map(|entry| Arc::clone(entry.value()))
    }

    /// Visit every entry present when the traversal starts.
    ///
    /// Stops early when `visit` returns `false`. Entries inserted during the
    /// traversal may or may not be visited.
    pub fn range<F>(&self, mut visit: F)
    where
        F: FnMut(&KeyPath, &Arc<V>) -> bool,
    {
        let copied: Vec<(KeyPath, Arc<V>)> = self
            .entries
            .iter()
            .map(|entry| (entry.key().clone(), Arc::clone(entry.value())))
            .collect();
        for (key, value) in &copied {
            if !visit(key, value) {
                break;
            }
        }
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when the index holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V: ?Sized> Default for KeyIndex<V> {
    fn default() -> Self {
        Self::new()
    }
}
