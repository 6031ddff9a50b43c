//! The three marker watchers

use log::debug;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::error::{StoreOp, WaitError, WaitResult};
use crate::keys::{JobKeys, ERROR_EXT, OK_EXT, STARTED_EXT};
use crate::progress::ProgressSink;
use crate::store::{ObjectMeta, ObjectStore};

/// What a watcher saw. Each watcher yields exactly one of these, or an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The job picked up the work; not terminal.
    Started,
    /// The job failed; carries the error marker's body.
    Failed(String),
    /// The job finished; carries the artifact size in bytes.
    Completed(u64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatcherKind {
    Started,
    Error,
    Ok,
}

impl WatcherKind {
    pub const ALL: [WatcherKind; 3] = [WatcherKind::Started, WatcherKind::Error, WatcherKind::Ok];

    pub fn suffix(&self) -> &'static str {
        match self {
            WatcherKind::Started => STARTED_EXT,
            WatcherKind::Error => ERROR_EXT,
            WatcherKind::Ok => OK_EXT,
        }
    }

    pub fn key<'a>(&self, keys: &'a JobKeys) -> &'a str {
        match self {
            WatcherKind::Started => &keys.started,
            WatcherKind::Error => &keys.error,
            WatcherKind::Ok => &keys.ok,
        }
    }
}

/// Everything a watcher needs, shared by all three.
pub(crate) struct WatchContext<S> {
    pub(crate) store: Arc<S>,
    pub(crate) keys: JobKeys,
    pub(crate) timeout: Duration,
    pub(crate) progress: ProgressSink,
    /// The run's scope; the ok watcher cancels it.
    pub(crate) run: CancellationToken,
    /// The caller's scope; only outside cancellation stops the final size lookup.
    pub(crate) parent: CancellationToken,
}

impl<S: ObjectStore> WatchContext<S> {
    pub(crate) async fn watch(&self, kind: WatcherKind) -> WaitResult<WaitOutcome> {
        let outcome = match kind {
            WatcherKind::Started => self.watch_started().await,
            WatcherKind::Error => self.watch_error().await,
            WatcherKind::Ok => self.watch_ok().await,
        };
        debug!("watcher_done: {} -> {:?}", kind.key(&self.keys), outcome);
        outcome
    }

    /// Existence-wait on `key`, abandoned as soon as the run is cancelled.
    async fn wait_marker(&self, key: &str) -> WaitResult<ObjectMeta> {
        tokio::select! {
            _ = self.run.cancelled() => Err(WaitError::Cancelled),
            result = self.store.wait_for_existence(key, self.timeout) => {
                result.map_err(|e| WaitError::store(StoreOp::WaitFor, key, e))
            }
        }
    }

    async fn watch_started(&self) -> WaitResult<WaitOutcome> {
        self.wait_marker(&self.keys.started).await?;
        self.progress.line(format!("got {}", STARTED_EXT)).await;
        self.progress.describe("running").await;
        Ok(WaitOutcome::Started)
    }

    async fn watch_error(&self) -> WaitResult<WaitOutcome> {
        let key = &self.keys.error;
        self.wait_marker(key).await?;
        self.progress.line(format!("got {}", ERROR_EXT)).await;

        let body = tokio::select! {
            _ = self.run.cancelled() => return Err(WaitError::Cancelled),
            body = self.store.get_object(key) => {
                body.map_err(|e| WaitError::store(StoreOp::Read, key, e))?
            }
        };
        Ok(WaitOutcome::Failed(
            String::from_utf8_lossy(&body).into_owned(),
        ))
    }

    /// Once `.ok` exists the run is decided: cancel the siblings first, then
    /// look up the artifact size under the caller's scope only.
    async fn watch_ok(&self) -> WaitResult<WaitOutcome> {
        self.wait_marker(&self.keys.ok).await?;
        self.progress.line(format!("got {}", OK_EXT)).await;
        self.run.cancel();

        let artifact = &self.keys.artifact;
        let meta = tokio::select! {
            _ = self.parent.cancelled() => return Err(WaitError::Cancelled),
            meta = self.store.head_object(artifact) => {
                meta.map_err(|e| WaitError::store(StoreOp::Head, artifact, e))?
            }
        };
        Ok(WaitOutcome::Completed(meta.size))
    }
}
