//! Shared fixtures for integration tests.
//!
//! [`ScriptedSource`] plays the part of the cluster: it answers the initial
//! fetch from a fixed value and forwards whatever the test pushes into its
//! watch stream.

#![allow(dead_code, reason = "each test binary uses a different subset")]

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use futures::StreamExt;
use futures::channel::mpsc::{UnboundedReceiver, UnboundedSender, unbounded};
use konfig::{BoxError, ConfigMap, ConfigMapSource, EventStream, Konfig, WatchEvent};
use parking_lot::Mutex;
use tokio::time::timeout;

/// Namespace shared by every fixture object.
pub const NAMESPACE: &str = "default";

/// Name of the ConfigMap the stores under test follow.
pub const NAME: &str = "app-config";

/// How long a test waits for the pump before failing.
pub const WAIT: Duration = Duration::from_secs(5);

/// What the initial fetch returns.
pub enum Fetch {
    /// The ConfigMap exists.
    Found(ConfigMap),
    /// The ConfigMap does not exist yet.
    Missing,
    /// The API call fails.
    Fails(&'static str),
}

/// A `ConfigMapSource` driven by the test.
pub struct ScriptedSource {
    fetch: Fetch,
    stream: Mutex<Option<UnboundedReceiver<WatchEvent>>>,
    watch_fails: bool,
    since: Mutex<Option<String>>,
}

impl ScriptedSource {
    /// A source answering `fetch` and a sender feeding its watch stream.
    pub fn new(fetch: Fetch) -> (Arc<Self>, UnboundedSender<WatchEvent>) {
        let (tx, rx) = unbounded();
        let source = Self {
            fetch,
            stream: Mutex::new(Some(rx)),
            watch_fails: false,
            since: Mutex::new(None),
        };
        (Arc::new(source), tx)
    }

    /// A source whose fetch succeeds but whose watch cannot be opened.
    pub fn broken_watch(fetch: Fetch) -> Arc<Self> {
        Arc::new(Self {
            fetch,
            stream: Mutex::new(None),
            watch_fails: true,
            since: Mutex::new(None),
        })
    }

    /// Resource version the store asked the watch to start after.
    pub fn watched_since(&self) -> Option<String> {
        self.since.lock().clone()
    }
}

#[async_trait]
impl ConfigMapSource for ScriptedSource {
    async fn fetch(&self, name: &str) -> Result<Option<ConfigMap>, BoxError> {
        match &self.fetch {
            Fetch::Found(object) if object.name == name => Ok(Some(object.clone())),
            Fetch::Found(_) | Fetch::Missing => Ok(None),
            Fetch::Fails(reason) => Err((*reason).into()),
        }
    }

    async fn watch(&self, since: &str) -> Result<EventStream, BoxError> {
        *self.since.lock() = Some(since.to_owned());
        if self.watch_fails {
            return Err("watch refused".into());
        }
        let stream = self
            .stream
            .lock()
            .take()
            .ok_or("watch already opened")?;
        Ok(stream.boxed())
    }
}

/// A ConfigMap named [`NAME`] in [`NAMESPACE`].
pub fn config_map(version: &str, fields: &[(&str, &str)]) -> ConfigMap {
    fields
        .iter()
        .fold(ConfigMap::new(NAME, NAMESPACE, version), |object, (k, v)| {
            object.with_field(*k, *v)
        })
}

/// Wait until the store has published `revision` or later.
pub async fn wait_for_revision(konfig: &Konfig, revision: i64) -> Result<()> {
    let mut changes = konfig.changes();
    timeout(WAIT, changes.wait_for(|current| *current >= revision))
        .await
        .with_context(|| format!("timed out waiting for revision {revision}"))?
        .map_err(|err| anyhow!("change channel closed: {err}"))?;
    Ok(())
}

/// Wait until the store has published `generation` snapshots.
///
/// Useful when a publish does not advance the revision.
pub async fn wait_for_generation(konfig: &Konfig, generation: u64) -> Result<()> {
    let mut changes = konfig.changes();
    timeout(
        WAIT,
        changes.wait_for(|_| konfig.snapshot().generation() >= generation),
    )
    .await
    .with_context(|| format!("timed out waiting for publish {generation}"))?
    .map_err(|err| anyhow!("change channel closed: {err}"))?;
    Ok(())
}

/// Wait until the pump has stopped.
pub async fn wait_for_stop(konfig: &Konfig) -> Result<()> {
    timeout(WAIT, konfig.stopped())
        .await
        .context("timed out waiting for the pump to stop")
}

/// Push an event into a scripted watch stream.
pub fn push(tx: &UnboundedSender<WatchEvent>, event: WatchEvent) -> Result<()> {
    tx.unbounded_send(event)
        .map_err(|err| anyhow!("watch stream closed: {err}"))
}
