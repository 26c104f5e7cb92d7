//! The boundary to the cluster: ConfigMap objects, change events, and the
//! two ways they can be delivered.
//!
//! A [`ConfigMapSource`] serves direct watches: one point-in-time fetch
//! followed by an ordered event stream. Shared informers instead call back
//! into an [`InformerHandle`], which forwards events to the update pump
//! through a bounded channel.

use std::collections::BTreeMap;

use async_trait::async_trait;
use futures::stream::BoxStream;
use tokio::sync::mpsc;

use crate::error::{BoxError, KonfigError, KonfigResult};

/// The parts of a ConfigMap the store reads.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConfigMap {
    /// Object name.
    pub name: String,
    /// Object namespace.
    pub namespace: String,
    /// Opaque version token; decimal for Kubernetes resources.
    pub resource_version: String,
    /// The `data` section.
    pub data: BTreeMap<String, String>,
}

impl ConfigMap {
    /// Build a ConfigMap with the given identity and no data.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        namespace: impl Into<String>,
        resource_version: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            resource_version: resource_version.into(),
            data: BTreeMap::new(),
        }
    }

    /// Add one data field.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }
}

/// Kind of change carried by a [`WatchEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// The object was created.
    Added,
    /// The object was updated.
    Modified,
    /// The object was removed.
    Deleted,
}

/// One change to one ConfigMap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    /// What happened.
    pub kind: EventKind,
    /// The object after the change, or its last state when deleted.
    pub object: ConfigMap,
}

impl WatchEvent {
    /// An [`EventKind::Added`] event.
    #[must_use]
    pub const fn added(object: ConfigMap) -> Self {
        Self {
            kind: EventKind::Added,
            object,
        }
    }

    /// An [`EventKind::Modified`] event.
    #[must_use]
    pub const fn modified(object: ConfigMap) -> Self {
        Self {
            kind: EventKind::Modified,
            object,
        }
    }

    /// An [`EventKind::Deleted`] event.
    #[must_use]
    pub const fn deleted(object: ConfigMap) -> Self {
        Self {
            kind: EventKind::Deleted,
            object,
        }
    }
}

/// Stream of change events produced by a watch.
pub type EventStream = BoxStream<'static, WatchEvent>;

/// Read and watch access to the ConfigMaps of one namespace.
#[async_trait]
pub trait ConfigMapSource: Send + Sync {
    /// Fetch the named ConfigMap, or `None` when it does not exist.
    async fn fetch(&self, name: &str) -> Result<Option<ConfigMap>, BoxError>;

    /// Open a stream of changes newer than `since`.
    ///
    /// `since` is the resource version returned by the initial fetch, or
    /// empty when the ConfigMap did not exist. The stream may carry events
    /// for other ConfigMaps and events the store has already seen; the pump
    /// filters both. It ends when the watch closes.
    async fn watch(&self, since: &str) -> Result<EventStream, BoxError>;
}

/// Callback adaptor for shared informers.
///
/// Events for other objects are dropped here; matching ones are queued for
/// the update pump. When the queue is full the callback waits, which
/// applies backpressure to the informer.
#[derive(Debug, Clone)]
pub struct InformerHandle {
    name: String,
    namespace: String,
    queue: mpsc::Sender<WatchEvent>,
}

impl InformerHandle {
    pub(crate) const fn new(
        name: String,
        namespace: String,
        queue: mpsc::Sender<WatchEvent>,
    ) -> Self {
        Self {
            name,
            namespace,
            queue,
        }
    }

    fn matches(&self, object: &ConfigMap) -> bool {
        object.name == self.name && object.namespace == self.namespace
    }

    fn closed(&self) -> KonfigError {
        KonfigError::ChannelClosed {
            name: self.name.clone(),
        }
    }

    /// Forward an event, waiting for queue space.
    ///
    /// Returns `Ok(false)` when the event was for another object.
    ///
    /// # Errors
    ///
    /// Returns [`KonfigError::ChannelClosed`] once the pump has stopped.
    pub async fn deliver(&self, event: WatchEvent) -> KonfigResult<bool> {
        if !self.matches(&event.object) {
            return Ok(false);
        }
        self.queue.send(event).await.map_err(|_| self.closed())?;
        Ok(true)
    }

    /// Forward an event from a thread outside the async runtime, blocking
    /// while the queue is full.
    ///
    /// # Errors
    ///
    /// Returns [`KonfigError::ChannelClosed`] once the pump has stopped.
    ///
    /// # Panics
    ///
    /// Panics when called from within an async execution context, as
    /// [`mpsc::Sender::blocking_send`] does.
    pub fn deliver_blocking(&self, event: WatchEvent) -> KonfigResult<bool> {
        if !self.matches(&event.object) {
            return Ok(false);
        }
        self.queue.blocking_send(event).map_err(|_| self.closed())?;
        Ok(true)
    }

    /// Informer add callback.
    ///
    /// # Errors
    ///
    /// See [`InformerHandle::deliver`].
    pub async fn on_add(&self, object: ConfigMap) -> KonfigResult<bool> {
        self.deliver(WatchEvent::added(object)).await
    }

    /// Informer update callback. Only the new state is forwarded.
    ///
    /// # Errors
    ///
    /// See [`InformerHandle::deliver`].
    pub async fn on_update(&self, _old: ConfigMap, new: ConfigMap) -> KonfigResult<bool> {
        self.deliver(WatchEvent::modified(new)).await
    }

    /// Informer delete callback.
    ///
    /// # Errors
    ///
    /// See [`InformerHandle::deliver`].
    pub async fn on_delete(&self, object: ConfigMap) -> KonfigResult<bool> {
        self.deliver(WatchEvent::deleted(object)).await
    }
}
