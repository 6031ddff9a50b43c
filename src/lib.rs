//! `dbcopy`: follow database dumps that another process writes to S3.
//!
//! The writer announces a job with `<name>.started`, then finishes it with
//! either `<name>.ok` (the encrypted dump `<name>.bz2.crypt` is in place) or
//! `<name>.error` (whose body describes the failure). `dbcopy wait` blocks
//! until one of those shows up; the waiting itself lives in the
//! `marker-wait` crate.

pub mod cli;
pub mod commands;
pub mod config;
pub mod humanize;
pub mod providers;

use clap::Parser;
use log::debug;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;

use cli::{Cli, Command};

pub fn run() -> ExitCode {
    let env_file = match config::load_env() {
        Ok(env_file) => env_file,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    if let Some(path) = env_file {
        debug!("load_env: {}", path.display());
    }

    let cli = Cli::parse();

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: start runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let status = runtime.block_on(async move {
        let parent = CancellationToken::new();
        commands::cancel_on_ctrl_c(parent.clone());
        match cli.command {
            Command::Wait(args) => commands::run_wait(args, parent).await,
        }
    });
    ExitCode::from(status)
}
