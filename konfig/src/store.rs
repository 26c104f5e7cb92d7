//! The public store and its builder.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::decode::FieldTag;
use crate::env::{EnvMirror, EnvSink, ProcessEnv};
use crate::error::{KonfigError, KonfigResult};
use crate::key::KeyPath;
use crate::options::KonfigOptions;
use crate::pump::{DeliveryMode, Pump, PumpState};
use crate::revision::{EMPTY, NOT_FOUND, PARSE_FAILED, parse_revision};
use crate::snapshot::{Snapshot, SnapshotStore};
use crate::source::{ConfigMapSource, InformerHandle};
use crate::value::{Value, coerce, parse_data};
use crate::view::{Decoded, ViewRegistry, decode_at};

/// State shared between the store handles and the update pump.
#[derive(Debug)]
pub(crate) struct Shared {
    pub(crate) options: KonfigOptions,
    pub(crate) snapshots: SnapshotStore,
    pub(crate) views: ViewRegistry,
    pub(crate) env: EnvMirror,
    pub(crate) changes: watch::Sender<i64>,
    pub(crate) state: watch::Sender<PumpState>,
}

impl Shared {
    pub(crate) fn new(options: KonfigOptions, initial: Snapshot, sink: Arc<dyn EnvSink>) -> Self {
        let (changes, _) = watch::channel(initial.revision());
        let (state, _) = watch::channel(PumpState::Uninitialized);
        Self {
            options,
            snapshots: SnapshotStore::new(initial),
            views: ViewRegistry::default(),
            env: EnvMirror::new(sink),
            changes,
            state,
        }
    }
}

/// A cached, continuously updated view of one ConfigMap.
///
/// Cloning is cheap; every clone reads the same state. All reads are
/// lock-free and return the value together with the revision it came
/// from, or a sentinel from [`crate::revision`] when no value is
/// available.
///
/// ```no_run
/// use konfig::{ConfigMapSource, FieldTag, Konfig, KonfigOptions};
/// use serde::Deserialize;
/// use tokio_util::sync::CancellationToken;
///
/// #[derive(Debug, Default, Deserialize)]
/// #[serde(default)]
/// struct LogConfig {
///     log_level: i32,
///     also_to_stderr: bool,
/// }
///
/// # async fn run(source: &dyn ConfigMapSource) -> konfig::KonfigResult<()> {
/// let store = Konfig::builder(KonfigOptions::new("app-config", "default"))
///     .watch(source, CancellationToken::new())
///     .await?;
/// let (level, revision) = store.get_int64(&["level"]);
/// let (logging, _) = store.register::<LogConfig>(FieldTag::CamelCase, &["cfg"]);
/// # let _ = (level, revision, logging);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Konfig {
    shared: Arc<Shared>,
}

impl Konfig {
    /// Start building a store for the ConfigMap named in `options`.
    #[must_use]
    pub fn builder(options: KonfigOptions) -> KonfigBuilder {
        KonfigBuilder::new(options)
    }

    fn scalar<T: Default>(&self, keys: &[&str], convert: impl FnOnce(&Value) -> Option<T>) -> (T, i64) {
        let snapshot = self.shared.snapshots.current();
        snapshot
            .lookup(keys)
            .and_then(convert)
            .map_or((T::default(), NOT_FOUND), |value| (value, snapshot.revision()))
    }

    /// The raw value at `keys`: a string leaf or a mapping.
    ///
    /// Returns [`Value::Null`] with [`NOT_FOUND`] when the path is absent.
    #[must_use]
    pub fn get(&self, keys: &[&str]) -> (Value, i64) {
        self.scalar(keys, |value| Some(value.clone()))
    }

    /// The value at `keys` as a boolean.
    #[must_use]
    pub fn get_bool(&self, keys: &[&str]) -> (bool, i64) {
        self.scalar(keys, coerce::to_bool)
    }

    /// The value at `keys` as a 64-bit integer, truncating fractions.
    #[must_use]
    pub fn get_int64(&self, keys: &[&str]) -> (i64, i64) {
        self.scalar(keys, coerce::to_i64)
    }

    /// The value at `keys` as a platform-sized integer.
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        reason = "platform-width reads truncate like the 32-bit accessor"
    )]
    pub fn get_int(&self, keys: &[&str]) -> (isize, i64) {
        self.scalar(keys, |value| coerce::to_i64(value).map(|n| n as isize))
    }

    /// The value at `keys` as a 32-bit integer, truncating out-of-range
    /// values.
    #[must_use]
    pub fn get_int32(&self, keys: &[&str]) -> (i32, i64) {
        self.scalar(keys, coerce::to_i32)
    }

    /// The value at `keys` as a 64-bit float.
    #[must_use]
    pub fn get_float64(&self, keys: &[&str]) -> (f64, i64) {
        self.scalar(keys, coerce::to_f64)
    }

    /// The value at `keys` as a 32-bit float.
    #[must_use]
    pub fn get_float32(&self, keys: &[&str]) -> (f32, i64) {
        self.scalar(keys, coerce::to_f32)
    }

    /// The value at `keys` rendered as text. Mappings render as JSON.
    #[must_use]
    pub fn get_string(&self, keys: &[&str]) -> (String, i64) {
        self.scalar(keys, |value| Some(coerce::to_text(value)))
    }

    /// Register a view of type `T` over the subtree at `keys` and return its
    /// first decode.
    ///
    /// The view is re-decoded on every update. A later failed decode keeps
    /// the last good instance and reports [`PARSE_FAILED`]; a missing
    /// subtree resets it to `T::default()` with [`NOT_FOUND`].
    #[expect(
        clippy::must_use_candidate,
        reason = "registering for later get_view reads is a valid use"
    )]
    pub fn register<T>(&self, tag: FieldTag, keys: &[&str]) -> (Arc<T>, i64)
    where
        T: DeserializeOwned + Default + Send + Sync + 'static,
    {
        self.shared
            .views
            .register::<T>(&self.shared.snapshots, KeyPath::new(keys), tag)
    }

    /// The latest decode of the view registered at `keys`.
    ///
    /// Returns `None` when nothing was registered there with type `T`.
    #[must_use]
    pub fn get_view<T>(&self, keys: &[&str]) -> Option<(Arc<T>, i64)>
    where
        T: DeserializeOwned + Default + Send + Sync + 'static,
    {
        self.shared.views.get::<T>(&KeyPath::new(keys))
    }

    /// Decode the subtree at `keys` once, without registering a view.
    #[must_use]
    pub fn decode<T: DeserializeOwned>(&self, tag: FieldTag, keys: &[&str]) -> (Option<T>, i64) {
        let snapshot = self.shared.snapshots.current();
        match decode_at::<T, _>(&snapshot, keys, tag) {
            Decoded::Value(value, revision) => (Some(value), revision),
            Decoded::NotFound => (None, NOT_FOUND),
            Decoded::ParseFailed(err) => {
                debug!(path = %KeyPath::new(keys), error = %err, "decode failed");
                (None, PARSE_FAILED)
            }
        }
    }

    /// Decode the subtree at `keys` into `destination`.
    ///
    /// `destination` is replaced only on success.
    pub fn decode_into<T: DeserializeOwned>(
        &self,
        destination: &mut T,
        tag: FieldTag,
        keys: &[&str],
    ) -> i64 {
        let (decoded, revision) = self.decode::<T>(tag, keys);
        if let Some(value) = decoded {
            *destination = value;
        }
        revision
    }

    /// Mirror the top-level fields under `keys` into the environment, now
    /// and after every update.
    pub fn mount_env(&self, keys: &[&str]) {
        let snapshots = &self.shared.snapshots;
        self.shared.env.mount(KeyPath::new(keys));
        let exported_from = snapshots.current();
        self.shared.env.export(&exported_from);

        // The pump may have published, and exported under the old mount,
        // between the read and the export.
        let latest = snapshots.current();
        if !Arc::ptr_eq(&latest, &exported_from) {
            self.shared.env.export(&latest);
        }
    }

    /// Stop mirroring into the environment.
    pub fn unmount_env(&self) {
        self.shared.env.unmount();
    }

    /// Revision of the current snapshot.
    #[must_use]
    pub fn revision(&self) -> i64 {
        self.shared.snapshots.revision()
    }

    /// The current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.shared.snapshots.current()
    }

    /// Subscribe to publishes. The channel carries the latest revision.
    #[must_use]
    pub fn changes(&self) -> watch::Receiver<i64> {
        self.shared.changes.subscribe()
    }

    /// Current lifecycle state of the update pump.
    #[must_use]
    pub fn pump_state(&self) -> PumpState {
        *self.shared.state.borrow()
    }

    /// Wait until the update pump has exited.
    pub async fn stopped(&self) {
        let mut state = self.shared.state.subscribe();
        if let Err(err) = state
            .wait_for(|current| *current == PumpState::Terminated)
            .await
        {
            debug!(error = %err, "pump state channel closed");
        }
    }

    /// Options the store was built with.
    #[must_use]
    pub fn options(&self) -> &KonfigOptions {
        &self.shared.options
    }
}

/// Configures and starts a [`Konfig`].
pub struct KonfigBuilder {
    options: KonfigOptions,
    sink: Arc<dyn EnvSink>,
}

impl KonfigBuilder {
    fn new(options: KonfigOptions) -> Self {
        Self {
            options,
            sink: Arc::new(ProcessEnv),
        }
    }

    /// Export the env mirror into `sink` instead of the process
    /// environment.
    #[must_use]
    pub fn env_sink(mut self, sink: Arc<dyn EnvSink>) -> Self {
        self.sink = sink;
        self
    }

    fn into_shared(self, initial: Snapshot) -> Arc<Shared> {
        let mount = self.options.env_mount_path();
        let shared = Shared::new(self.options, initial, self.sink);
        if let Some(path) = mount {
            shared.env.mount(path);
            shared.env.export(&shared.snapshots.current());
        }
        Arc::new(shared)
    }

    /// Load the ConfigMap from `source` and follow its watch stream until
    /// `cancel` fires or the stream ends.
    ///
    /// A ConfigMap that does not exist yet starts the store empty at
    /// revision [`EMPTY`].
    ///
    /// # Errors
    ///
    /// Returns [`KonfigError::Fetch`] when the initial fetch fails,
    /// [`KonfigError::InvalidRevision`] when the fetched version is not a
    /// number, and [`KonfigError::Watch`] when the stream cannot be opened.
    pub async fn watch(
        self,
        source: &dyn ConfigMapSource,
        cancel: CancellationToken,
    ) -> KonfigResult<Konfig> {
        let name = self.options.name.clone();
        let fetched = source
            .fetch(&name)
            .await
            .map_err(|err| KonfigError::Fetch {
                name: name.clone(),
                source: err,
            })?;
        let (initial, since) = match fetched {
            Some(object) => {
                let revision = parse_revision(&object.resource_version)?;
                (
                    Snapshot::new(revision, parse_data(&object.data)),
                    object.resource_version,
                )
            }
            None => {
                debug!(name = %name, "ConfigMap does not exist yet; starting empty");
                (Snapshot::empty(EMPTY), String::new())
            }
        };
        let events = source
            .watch(&since)
            .await
            .map_err(|err| KonfigError::Watch { name, source: err })?;

        let tracked = initial.revision();
        let shared = self.into_shared(initial);
        Pump::new(Arc::clone(&shared), DeliveryMode::Watch, tracked).spawn_watch(events, cancel);
        Ok(Konfig { shared })
    }

    /// Start an empty store fed through the returned informer handle.
    ///
    /// The informer's initial listing arrives as add events. The pump stops
    /// when `cancel` fires or every clone of the handle is dropped.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime, as [`tokio::spawn`]
    /// does.
    #[must_use]
    pub fn informer(self, cancel: CancellationToken) -> (Konfig, InformerHandle) {
        let (queue, events) = mpsc::channel(self.options.buffer_capacity.max(1));
        let handle = InformerHandle::new(
            self.options.name.clone(),
            self.options.namespace.clone(),
            queue,
        );
        let shared = self.into_shared(Snapshot::empty(EMPTY));
        Pump::new(Arc::clone(&shared), DeliveryMode::Informer, EMPTY)
            .spawn_informer(events, cancel);
        (Konfig { shared }, handle)
    }
}

impl std::fmt::Debug for KonfigBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KonfigBuilder")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
