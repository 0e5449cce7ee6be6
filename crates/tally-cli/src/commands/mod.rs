//! Subcommand routing and exit codes

mod config;
mod run;
mod status;

use crate::args::{Cli, Commands};
use crate::signal::INTERRUPTED_EXIT_CODE;
use colored::Colorize;
use std::process::ExitCode;
use tally_core::TallyError;

/// Documented process exit codes.
///
/// A supervising restart loop keys off these: rerun on 0, stop on anything
/// else.
pub mod exit {
    /// One chunk was processed and the checkpoint advanced
    pub const CHUNK_PROCESSED: u8 = 0;
    /// Configuration, dataset, or checkpoint failure
    pub const FATAL: u8 = 1;
    /// Every item is already processed
    pub const NOTHING_TO_DO: u8 = 2;
}

/// Route the parsed CLI to its command and map the result to an exit code
pub async fn route(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Some(Commands::Run { start }) => run::execute(&cli.config_file, start).await,
        None => run::execute(&cli.config_file, None).await,
        Some(Commands::Status) => status::execute(&cli.config_file).await,
        Some(Commands::Config { action }) => config::execute(&cli.config_file, action).await,
    };

    match result {
        Ok(code) => code,
        Err(error) => match error.downcast_ref::<TallyError>() {
            Some(TallyError::Interrupted) => {
                eprintln!(
                    "{}",
                    "Interrupted - checkpoint left untouched; rerun to retry this chunk."
                        .yellow()
                );
                ExitCode::from(INTERRUPTED_EXIT_CODE)
            }
            _ => {
                eprintln!("{} {:#}", "error:".red().bold(), error);
                ExitCode::from(exit::FATAL)
            }
        },
    }
}
