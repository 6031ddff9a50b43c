use log::{debug, info};
use marker_wait::{WaitCoordinator, WaitError};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::CommandError;
use crate::cli::WaitArgs;
use crate::config::StoreConfig;
use crate::humanize::humanize_bytes;
use crate::providers::{create_s3_client, S3Store};

/// Exit status for an interrupted run (128 + SIGINT)
pub const INTERRUPTED_STATUS: u8 = 130;

/// Cancel `parent` on Ctrl-C.
pub fn cancel_on_ctrl_c(parent: CancellationToken) {
    tokio::spawn(async move {
        tokio::select! {
            _ = parent.cancelled() => {}
            signal = tokio::signal::ctrl_c() => match signal {
                Ok(()) => {
                    debug!("ctrl_c: cancelling");
                    parent.cancel();
                }
                Err(e) => debug!("ctrl_c: listener failed: {}", e),
            }
        }
    });
}

/// Wait for `<name>.bz2.crypt` and return its size.
pub async fn wait(args: &WaitArgs, parent: &CancellationToken) -> Result<u64, CommandError> {
    let config = StoreConfig::from_args(&args.store);
    debug!("wait: {:?}", config);

    let client = tokio::select! {
        biased;
        _ = parent.cancelled() => return Err(CommandError::wait(&args.name, WaitError::Cancelled)),
        client = create_s3_client(&config) => client.map_err(CommandError::Client)?,
    };
    let store = S3Store::new(client, config.bucket);

    WaitCoordinator::new(Arc::new(store))
        .with_timeout(args.timeout)
        .run(parent, &args.name)
        .await
        .map_err(|e| CommandError::wait(&args.name, e))
}

/// Run `wait`, print the size and map the result to an exit status.
pub async fn run_wait(args: WaitArgs, parent: CancellationToken) -> u8 {
    let result = wait(&args, &parent).await;
    if let Ok(size) = &result {
        println!("{}", size);
        info!("size: {}", humanize_bytes(*size, true));
    }
    exit_status(&result, parent.is_cancelled())
}

/// 0 on success, 130 when interrupted, 1 otherwise. Failures are printed here.
pub fn exit_status(result: &Result<u64, CommandError>, interrupted: bool) -> u8 {
    match result {
        Ok(_) => 0,
        Err(e) if interrupted && e.is_cancelled() => INTERRUPTED_STATUS,
        Err(e) => {
            eprintln!("Error: {}", e);
            if interrupted {
                INTERRUPTED_STATUS
            } else {
                1
            }
        }
    }
}
