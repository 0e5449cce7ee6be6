//! CLI argument definitions using clap
//!
//! - tally                      # Process the next chunk (resume from checkpoint)
//! - tally run --start 40       # Process one chunk starting at index 40
//! - tally status               # Checkpoint position and remaining work
//! - tally config init          # Create a config file

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Default configuration file name used across all CLI commands.
pub const DEFAULT_CONFIG_FILE: &str = "tally_config.json";

#[derive(Parser)]
#[command(name = "tally")]
#[command(about = "Tally - chunked, resumable benchmark evaluation for local LLMs")]
#[command(
    long_about = r#"Tally - chunked, resumable benchmark evaluation for local LLMs

USAGE:
  tally                          # Process the next chunk (resumes from checkpoint)
  tally run --start 40           # Process one chunk starting at index 40
  tally status                   # Show checkpoint position and remaining work
  tally config init              # Create a config file

EXIT CODES:
  0    chunk processed
  1    fatal error (config, dataset, checkpoint)
  2    nothing to do - every item is already processed
  130  interrupted before the chunk completed

Run the binary in a loop (shell while, cron, a systemd unit) until it exits
with code 2; each run processes one chunk and advances the checkpoint."#
)]
#[command(version)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    pub config_file: PathBuf,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Process the next chunk of the dataset (the default command)
    Run {
        /// Start offset, overriding the stored checkpoint
        #[arg(long)]
        start: Option<usize>,
    },

    /// Show dataset size, checkpoint position, and remaining items
    Status,

    /// Manage configuration files
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigAction {
    /// Display current configuration settings
    Show,

    /// Validate configuration file for errors
    Validate,

    /// Create a new configuration file with defaults
    Init {
        /// Overwrite existing file without prompting
        #[arg(long)]
        force: bool,
    },
}
