use log::debug;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{WaitError, WaitResult};

/// Per-run bookkeeping owned by the coordinator: the cancellation scope every
/// task shares, the start instant, and the terminal result slot.
pub(crate) struct RunState {
    scope: CancellationToken,
    started: Instant,
    terminal: Option<WaitResult<u64>>,
}

impl RunState {
    /// The scope is a child of `parent`, so cancelling the parent reaches every task.
    pub(crate) fn new(parent: &CancellationToken) -> Self {
        Self {
            scope: parent.child_token(),
            started: Instant::now(),
            terminal: None,
        }
    }

    pub(crate) fn scope(&self) -> &CancellationToken {
        &self.scope
    }

    pub(crate) fn started(&self) -> Instant {
        self.started
    }

    pub(crate) fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Record the terminal result. Only the first call has any effect.
    pub(crate) fn settle(&mut self, result: WaitResult<u64>) -> bool {
        if let Some(current) = &self.terminal {
            debug!(
                "run_state_ignored: terminal={:?} late={:?}",
                current.as_ref().map_err(ToString::to_string),
                result.as_ref().map_err(ToString::to_string)
            );
            return false;
        }
        self.terminal = Some(result);
        true
    }

    pub(crate) fn cancel(&self) {
        self.scope.cancel();
    }

    /// Close the scope and hand back the result. A run that ended without any
    /// terminal value was cancelled from outside.
    pub(crate) fn finish(self) -> WaitResult<u64> {
        self.scope.cancel();
        self.terminal.unwrap_or(Err(WaitError::Cancelled))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_result_wins() {
        let parent = CancellationToken::new();
        let mut state = RunState::new(&parent);
        assert!(state.settle(Ok(10)));
        assert!(!state.settle(Err(WaitError::Remote("late".into()))));
        assert!(!state.settle(Ok(20)));

        assert_eq!(state.finish().unwrap(), 10);
    }

    #[test]
    fn unsettled_runs_report_cancellation() {
        let parent = CancellationToken::new();
        let state = RunState::new(&parent);
        let scope = state.scope().clone();
        parent.cancel();
        assert!(scope.is_cancelled());
        assert!(state.finish().unwrap_err().is_cancelled());
    }

    #[test]
    fn cancelling_the_run_leaves_the_parent_alone() {
        let parent = CancellationToken::new();
        let state = RunState::new(&parent);
        state.cancel();
        assert!(state.scope().is_cancelled());
        assert!(!parent.is_cancelled());
    }
}
