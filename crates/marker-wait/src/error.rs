use std::fmt;
use std::io;
use std::time::Duration;
use thiserror::Error;

use crate::store::StoreError;

pub type WaitResult<T> = Result<T, WaitError>;

/// Store operation a failure happened in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    WaitFor,
    Read,
    Head,
}

impl fmt::Display for StoreOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreOp::WaitFor => write!(f, "wait for"),
            StoreOp::Read => write!(f, "reading"),
            StoreOp::Head => write!(f, "heading"),
        }
    }
}

#[derive(Debug, Error)]
pub enum WaitError {
    /// No marker showed up before the deadline.
    #[error("wait for {key:?}: exceeded max wait time of {after:?}")]
    Timeout { key: String, after: Duration },

    /// The job wrote its error marker; the payload is the marker's body.
    #[error("remote error:\n{0}")]
    Remote(String),

    #[error("{op} {key:?}: {source}")]
    Store {
        op: StoreOp,
        key: String,
        #[source]
        source: StoreError,
    },

    /// The run's scope was cancelled before a terminal outcome.
    #[error("cancelled")]
    Cancelled,

    #[error("progress display: {0}")]
    Progress(#[from] io::Error),

    #[error("task failed: {0}")]
    Task(String),
}

impl WaitError {
    /// Wrap a store failure, turning deadline errors into `Timeout`.
    pub(crate) fn store(op: StoreOp, key: &str, source: StoreError) -> Self {
        match source {
            StoreError::WaitTimeout(after) => WaitError::Timeout {
                key: key.to_string(),
                after,
            },
            source => WaitError::Store {
                op,
                key: key.to_string(),
                source,
            },
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, WaitError::Cancelled)
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, WaitError::Timeout { .. })
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, WaitError::Remote(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deadline_errors_become_timeouts() {
        let err = WaitError::store(
            StoreOp::WaitFor,
            "job.ok",
            StoreError::WaitTimeout(Duration::from_secs(5)),
        );
        assert!(err.is_timeout());
        assert_eq!(
            err.to_string(),
            "wait for \"job.ok\": exceeded max wait time of 5s"
        );
    }

    #[test]
    fn store_errors_name_the_operation_and_key() {
        let err = WaitError::store(StoreOp::Read, "job.error", StoreError::backend("boom"));
        assert!(!err.is_timeout());
        assert!(!err.is_remote());
        assert_eq!(err.to_string(), "reading \"job.error\": boom");
    }

    #[test]
    fn remote_errors_carry_the_body() {
        let err = WaitError::Remote("pg_dump: connection refused".to_string());
        assert!(err.is_remote());
        assert_eq!(err.to_string(), "remote error:\npg_dump: connection refused");
    }
}
