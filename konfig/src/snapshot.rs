//! Immutable snapshots and the lock-free cell that publishes them.

use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::revision::EMPTY;
use crate::value::{Mapping, Value};

/// One immutable, parsed state of the ConfigMap.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    revision: i64,
    generation: u64,
    root: Value,
}

impl Snapshot {
    /// An empty snapshot carrying `revision`.
    #[must_use]
    pub const fn empty(revision: i64) -> Self {
        Self {
            revision,
            generation: 0,
            root: Value::Map(Mapping::new()),
        }
    }

    /// A snapshot over an already parsed tree.
    #[must_use]
    pub const fn new(revision: i64, root: Value) -> Self {
        Self {
            revision,
            generation: 0,
            root,
        }
    }

    /// Revision of the ConfigMap content this snapshot was built from.
    #[must_use]
    pub const fn revision(&self) -> i64 {
        self.revision
    }

    /// Publish counter assigned by the owning [`SnapshotStore`].
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// The root of the value tree.
    #[must_use]
    pub const fn root(&self) -> &Value {
        &self.root
    }

    /// Returns `true` when the snapshot holds no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.root.as_map().is_none_or(Mapping::is_empty)
    }

    /// Walk `keys` through the tree.
    ///
    /// An empty snapshot reports every path as missing, the root included,
    /// so an empty ConfigMap reads the same as an absent one.
    #[must_use]
    pub fn lookup<S: AsRef<str>>(&self, keys: &[S]) -> Option<&Value> {
        if self.is_empty() {
            return None;
        }
        self.root.lookup(keys)
    }
}

/// Holds the current snapshot behind an atomically swapped reference.
///
/// Readers never block. Writes happen only from the update pump, so a
/// plain store is enough.
#[derive(Debug)]
pub struct SnapshotStore {
    current: ArcSwap<Snapshot>,
}

impl SnapshotStore {
    /// Create a store holding `initial`.
    #[must_use]
    pub fn new(initial: Snapshot) -> Self {
        Self {
            current: ArcSwap::from_pointee(initial),
        }
    }

    /// The latest published snapshot.
    ///
    /// The returned reference stays internally consistent for as long as
    /// it is held, regardless of later publishes.
    #[must_use]
    pub fn current(&self) -> Arc<Snapshot> {
        self.current.load_full()
    }

    /// Revision of the latest published snapshot.
    #[must_use]
    pub fn revision(&self) -> i64 {
        self.current.load().revision
    }

    /// Replace the current snapshot and return the published value.
    pub(crate) fn publish(&self, mut snapshot: Snapshot) -> Arc<Snapshot> {
        snapshot.generation = self.current.load().generation.wrapping_add(1);
        let published = Arc::new(snapshot);
        self.current.store(Arc::clone(&published));
        published
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new(Snapshot::empty(EMPTY))
    }
}
