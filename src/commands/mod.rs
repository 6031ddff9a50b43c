//! Subcommands of the `dbcopy` binary

mod wait;

pub use wait::{cancel_on_ctrl_c, exit_status, run_wait, wait, INTERRUPTED_STATUS};

use marker_wait::WaitError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("{0}")]
    Client(Box<dyn std::error::Error + Send + Sync>),
    #[error("wait for {name:?}: {source}")]
    Wait {
        name: String,
        #[source]
        source: WaitError,
    },
}

impl CommandError {
    pub fn wait(name: &str, source: WaitError) -> Self {
        CommandError::Wait {
            name: name.to_string(),
            source,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, CommandError::Wait { source, .. } if source.is_cancelled())
    }
}
