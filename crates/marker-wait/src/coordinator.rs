//! Run the watchers and the progress renderer, and pick the run's result

use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;

use crate::error::{WaitError, WaitResult};
use crate::keys::JobKeys;
use crate::progress::{progress_channel, ProgressSurface, TerminalSurface};
use crate::state::RunState;
use crate::store::ObjectStore;
use crate::watcher::{WaitOutcome, WatchContext, WatcherKind};

/// Default deadline for every existence-wait
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(60 * 60);

pub struct WaitCoordinator<S> {
    store: Arc<S>,
    timeout: Duration,
}

impl<S: ObjectStore> WaitCoordinator<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            timeout: DEFAULT_WAIT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Wait for `job` with a spinner on stderr. See [`WaitCoordinator::run_with`].
    pub async fn run(&self, parent: &CancellationToken, job: &str) -> WaitResult<u64> {
        self.run_with(parent, job, TerminalSurface::stderr()).await
    }

    /// Wait for `job` to finish and return the artifact size in bytes.
    ///
    /// The renderer and the three watchers share one scope derived from
    /// `parent`. The first terminal outcome the coordinator observes wins:
    /// `.ok` followed by a size, `.error` followed by its body, or the first
    /// hard failure (timeout, store error). Errors caused by the scope being
    /// cancelled are dropped. If `.ok` and `.error` land at nearly the same
    /// moment, either may win; the ok watcher cancels the scope as soon as it
    /// sees its marker, so a slower error watcher loses.
    ///
    /// Cancelling `parent` before a terminal outcome yields
    /// [`WaitError::Cancelled`].
    pub async fn run_with<P: ProgressSurface>(
        &self,
        parent: &CancellationToken,
        job: &str,
        surface: P,
    ) -> WaitResult<u64> {
        let keys = JobKeys::new(job);
        let mut state = RunState::new(parent);
        info!("wait_start: {} timeout={:?}", keys.artifact, self.timeout);

        let (progress, renderer) = progress_channel(surface, state.started(), self.timeout);
        let mut render = tokio::spawn(renderer.run(state.scope().clone()));
        progress.line(format!("waiting for {}", keys.artifact)).await;

        let context = Arc::new(WatchContext {
            store: self.store.clone(),
            keys,
            timeout: self.timeout,
            progress,
            run: state.scope().clone(),
            parent: parent.clone(),
        });
        let mut watchers = JoinSet::new();
        for kind in WatcherKind::ALL {
            let context = context.clone();
            watchers.spawn(async move { (kind, context.watch(kind).await) });
        }
        drop(context);

        let mut rendering = true;
        loop {
            tokio::select! {
                joined = watchers.join_next() => match joined {
                    Some(Ok((kind, result))) => observe(&mut state, kind, result),
                    Some(Err(e)) => fail(&mut state, task_error("watcher", e)),
                    None => break,
                },
                rendered = &mut render, if rendering => {
                    rendering = false;
                    finish_render(&mut state, rendered);
                }
            }
        }

        // Every watcher is done; stop the renderer if nothing else did.
        state.cancel();
        if rendering {
            finish_render(&mut state, render.await);
        }

        let elapsed = state.elapsed();
        let result = state.finish();
        match &result {
            Ok(size) => info!("wait_done: {} size={} elapsed={:?}", job, size, elapsed),
            Err(e) if e.is_cancelled() => info!("wait_cancelled: {} elapsed={:?}", job, elapsed),
            Err(e) => warn!("wait_failed: {} elapsed={:?} error={}", job, elapsed, e),
        }
        result
    }
}

fn observe(state: &mut RunState, kind: WatcherKind, result: WaitResult<WaitOutcome>) {
    match result {
        Ok(WaitOutcome::Started) => debug!("wait_observed: {:?} started", kind),
        Ok(WaitOutcome::Completed(size)) => {
            state.settle(Ok(size));
            state.cancel();
        }
        Ok(WaitOutcome::Failed(detail)) => fail(state, WaitError::Remote(detail)),
        Err(e) if e.is_cancelled() => debug!("wait_observed: {:?} cancelled", kind),
        Err(e) => fail(state, e),
    }
}

fn fail(state: &mut RunState, error: WaitError) {
    state.settle(Err(error));
    state.cancel();
}

fn finish_render<P>(state: &mut RunState, rendered: Result<std::io::Result<P>, JoinError>) {
    match rendered {
        Ok(Ok(_)) => debug!("wait_renderer_done"),
        Ok(Err(e)) => fail(state, WaitError::Progress(e)),
        Err(e) => fail(state, task_error("renderer", e)),
    }
}

fn task_error(task: &str, error: JoinError) -> WaitError {
    WaitError::Task(format!("{} {}", task, error))
}
