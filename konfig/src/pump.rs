//! The update pump: the single writer that turns change events into
//! published snapshots.
//!
//! Every accepted event runs the same pipeline. The data is parsed, the
//! snapshot is published, registered views are re-decoded, the env mirror
//! is re-exported and finally subscribers to [`Konfig::changes`] are told
//! the new revision.
//!
//! [`Konfig::changes`]: crate::Konfig::changes

use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::revision::parse_revision;
use crate::snapshot::Snapshot;
use crate::source::{EventKind, EventStream, WatchEvent};
use crate::store::Shared;
use crate::value::{Mapping, parse_data};

/// Lifecycle of the update pump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PumpState {
    /// The initial load has not completed.
    #[default]
    Uninitialized,
    /// Events are being processed.
    Running,
    /// The pump has exited; the store stays readable at its last snapshot.
    Terminated,
}

/// How change events reach the pump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeliveryMode {
    /// A raw watch stream. Stale and duplicate events are possible and are
    /// filtered by revision.
    Watch,
    /// Shared-informer callbacks. Events arrive in order and are trusted.
    Informer,
}

pub(crate) struct Pump {
    shared: Arc<Shared>,
    mode: DeliveryMode,
    tracked: i64,
}

impl Pump {
    pub(crate) const fn new(shared: Arc<Shared>, mode: DeliveryMode, tracked: i64) -> Self {
        Self {
            shared,
            mode,
            tracked,
        }
    }

    fn is_target(&self, event: &WatchEvent) -> bool {
        let options = &self.shared.options;
        let object = &event.object;
        object.name == options.name
            && (self.mode == DeliveryMode::Watch || object.namespace == options.namespace)
    }

    /// Apply one event and report whether it produced a publish.
    pub(crate) fn handle(&mut self, event: &WatchEvent) -> bool {
        if !self.is_target(event) {
            debug!(
                name = %event.object.name,
                namespace = %event.object.namespace,
                "ignoring event for another ConfigMap"
            );
            return false;
        }
        let revision = match parse_revision(&event.object.resource_version) {
            Ok(revision) => revision,
            Err(err) => {
                warn!(error = %err, "dropping event with an unusable resource version");
                return false;
            }
        };
        if self.mode == DeliveryMode::Watch && revision <= self.tracked {
            debug!(revision, tracked = self.tracked, kind = ?event.kind, "dropping stale event");
            return false;
        }
        match event.kind {
            EventKind::Added | EventKind::Modified => {
                self.tracked = revision;
                self.publish(Snapshot::new(revision, parse_data(&event.object.data)));
            }
            EventKind::Deleted => {
                // An informer tombstone may carry an older version.
                self.tracked = self.tracked.max(revision);
                self.publish(Snapshot::empty(self.tracked));
            }
        }
        true
    }

    fn publish(&self, snapshot: Snapshot) {
        let published = self.shared.snapshots.publish(snapshot);
        let views = self.shared.views.refresh_all(&published);
        let exported = self.shared.env.export(&published);
        self.shared.changes.send_replace(published.revision());
        debug!(
            revision = published.revision(),
            fields = published.root().as_map().map_or(0, Mapping::len),
            views,
            exported,
            "published snapshot"
        );
    }

    fn start(&self) {
        self.shared.state.send_replace(PumpState::Running);
        info!(
            name = %self.shared.options.name,
            namespace = %self.shared.options.namespace,
            mode = ?self.mode,
            revision = self.tracked,
            "update pump started"
        );
    }

    fn finish(&self, reason: &'static str) {
        self.shared.state.send_replace(PumpState::Terminated);
        info!(
            name = %self.shared.options.name,
            revision = self.shared.snapshots.revision(),
            reason,
            "update pump stopped"
        );
    }

    /// Mark the pump running and drive it from a watch stream on a new task.
    pub(crate) fn spawn_watch(self, events: EventStream, cancel: CancellationToken) -> JoinHandle<()> {
        self.start();
        tokio::spawn(self.run_watch(events, cancel))
    }

    /// Mark the pump running and drive it from the informer queue on a new
    /// task.
    pub(crate) fn spawn_informer(
        self,
        queue: mpsc::Receiver<WatchEvent>,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        self.start();
        tokio::spawn(self.run_informer(queue, cancel))
    }

    async fn run_watch(mut self, mut events: EventStream, cancel: CancellationToken) {
        let reason = loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break "cancelled",
                next = events.next() => match next {
                    Some(event) => {
                        self.handle(&event);
                    }
                    None => break "watch stream ended",
                },
            }
        };
        self.finish(reason);
    }

    async fn run_informer(mut self, mut queue: mpsc::Receiver<WatchEvent>, cancel: CancellationToken) {
        let reason = loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break "cancelled",
                next = queue.recv() => match next {
                    Some(event) => {
                        self.handle(&event);
                    }
                    None => break "every informer handle was dropped",
                },
            }
        };
        queue.close();
        self.finish(reason);
    }
}
