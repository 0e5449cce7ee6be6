//! Tally CLI application
//!
//! Chunked, resumable benchmark evaluation for locally hosted chat models.
//!
//! Each invocation processes one chunk of the dataset, writes a CSV report,
//! advances the checkpoint, and exits. Drive it from a restart loop (shell
//! `while`, cron, a systemd unit) until it reports that no work remains:
//!
//! ```bash
//! while tally run; do :; done
//! ```
//!
//! Exit codes are documented in `tally --help`.

mod args;
mod commands;
mod signal;

use clap::Parser;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging with environment-based filtering
    // Set RUST_LOG=debug for verbose logging
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = args::Cli::parse();
    commands::route(cli).await
}
