//! Checkpoint and dataset status, without touching any model

use crate::commands::exit;
use console::style;
use std::path::Path;
use std::process::ExitCode;
use tally_core::{CheckpointStore, FileCheckpointStore, config, load_examples};

pub async fn execute(config_file: &Path) -> anyhow::Result<ExitCode> {
    let cfg = config::load_from_file(config_file)?;
    let items = load_examples(&cfg.dataset)?;

    let store = FileCheckpointStore::new(&cfg.checkpoint_file);
    let checkpoint = store.load().await?.unwrap_or(0);
    let remaining = items.len().saturating_sub(checkpoint);
    let chunks_left = remaining.div_ceil(cfg.chunk_size);

    println!("{}", style("Evaluation status").bold());
    println!("  Dataset:        {} ({} items)", cfg.dataset.display(), items.len());
    println!("  Models:         {}", cfg.models.join(", "));
    println!(
        "  Checkpoint:     {} ({})",
        checkpoint,
        cfg.checkpoint_file.display()
    );
    println!(
        "  Remaining:      {} items in {} chunk(s) of {}",
        remaining, chunks_left, cfg.chunk_size
    );

    if remaining == 0 {
        println!("  {}", style("All items processed.").green());
    }

    Ok(ExitCode::from(exit::CHUNK_PROCESSED))
}
