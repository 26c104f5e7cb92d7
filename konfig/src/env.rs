//! Mirroring a subtree into environment variables.
//!
//! The mirror writes through an [`EnvSink`] so tests and embedders can
//! capture exports without touching the real process environment.

use std::collections::BTreeMap;
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::key::KeyPath;
use crate::snapshot::Snapshot;
use crate::value::coerce;

/// Destination for exported name/value pairs.
pub trait EnvSink: Send + Sync {
    /// Set variable `name` to `value`.
    fn set(&self, name: &str, value: &str);
}

/// Writes into the process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl ProcessEnv {
    fn acceptable(name: &str, value: &str) -> bool {
        !name.is_empty() && !name.contains(['=', '\0']) && !value.contains('\0')
    }
}

impl EnvSink for ProcessEnv {
    fn set(&self, name: &str, value: &str) {
        if !Self::acceptable(name, value) {
            warn!(name, "skipping field that cannot be an environment variable");
            return;
        }
        // SAFETY: the update pump is the only writer the store drives, and
        // the name and value were checked for the characters `set_var`
        // rejects. Other threads mutating the environment concurrently is
        // the embedding process's responsibility.
        unsafe { std::env::set_var(name, value) };
    }
}

/// Records exports in memory.
#[derive(Debug, Default)]
pub struct MemoryEnv {
    vars: Mutex<BTreeMap<String, String>>,
}

impl MemoryEnv {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The last value exported for `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<String> {
        self.vars.lock().get(name).cloned()
    }

    /// Every exported variable.
    #[must_use]
    pub fn vars(&self) -> BTreeMap<String, String> {
        self.vars.lock().clone()
    }
}

impl EnvSink for MemoryEnv {
    fn set(&self, name: &str, value: &str) {
        self.vars.lock().insert(name.to_owned(), value.to_owned());
    }
}

/// Mount state plus the sink it exports into.
pub struct EnvMirror {
    mounted: ArcSwapOption<KeyPath>,
    sink: Arc<dyn EnvSink>,
    /// Generation of the newest snapshot exported; serialises writers.
    exported: Mutex<Option<u64>>,
}

impl EnvMirror {
    /// Create an unmounted mirror writing into `sink`.
    #[must_use]
    pub fn new(sink: Arc<dyn EnvSink>) -> Self {
        Self {
            mounted: ArcSwapOption::empty(),
            sink,
            exported: Mutex::new(None),
        }
    }

    /// Mirror `path` from now on.
    pub fn mount(&self, path: KeyPath) {
        self.mounted.store(Some(Arc::new(path)));
    }

    /// Stop mirroring. Variables already exported are left in place.
    pub fn unmount(&self) {
        self.mounted.store(None);
    }

    /// The mounted path, if any.
    #[must_use]
    pub fn mounted(&self) -> Option<Arc<KeyPath>> {
        self.mounted.load_full()
    }

    /// Export the mounted subtree of `snapshot` and return how many
    /// variables were written.
    ///
    /// Nothing is written when the mirror is unmounted, the subtree is
    /// absent or not a mapping, or a newer snapshot was already exported.
    #[expect(
        clippy::must_use_candidate,
        reason = "the count is informational; exporting is the effect"
    )]
    pub fn export(&self, snapshot: &Snapshot) -> usize {
        let mut exported = self.exported.lock();
        if exported.is_some_and(|generation| generation > snapshot.generation()) {
            debug!(
                generation = snapshot.generation(),
                "skipping export of a superseded snapshot"
            );
            return 0;
        }
        *exported = Some(snapshot.generation());
        let Some(path) = self.mounted() else {
            return 0;
        };
        let Some(fields) = snapshot.lookup(path.segments()).and_then(|v| v.as_map()) else {
            debug!(path = %path, "mounted env path is not a mapping; nothing exported");
            return 0;
        };
        for (name, value) in fields {
            self.sink.set(name, &coerce::to_text(value));
        }
        fields.len()
    }
}

impl Default for EnvMirror {
    fn default() -> Self {
        Self::new(Arc::new(ProcessEnv))
    }
}

impl std::fmt::Debug for EnvMirror {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvMirror")
            .field("mounted", &self.mounted())
            .finish_non_exhaustive()
    }
}
