//! One-chunk evaluation run

use crate::commands::exit;
use crate::signal;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use tally_core::{
    ChunkOutcome, CsvReportWriter, EvalRunner, FileCheckpointStore, InterruptManager,
    ModelOutcome, OllamaClient, config, extract_numeric, load_examples,
};

pub async fn execute(config_file: &Path, start_override: Option<usize>) -> anyhow::Result<ExitCode> {
    let cfg = config::load_from_file(config_file)?;
    cfg.validate()?;
    let items = load_examples(&cfg.dataset)?;

    let interrupts = InterruptManager::new();
    signal::install(interrupts.clone());

    let client = OllamaClient::new(cfg.provider.clone())?;
    let store = Arc::new(FileCheckpointStore::new(&cfg.checkpoint_file));
    let writer = CsvReportWriter::new(&cfg.output_dir, cfg.models.clone());

    let runner = EvalRunner::new(cfg.clone(), Arc::new(client), store)
        .with_interrupts(interrupts.clone());

    let start = runner.resolve_start(start_override).await?;
    tracing::debug!(start, total = items.len(), "resolved start offset");

    let chunk_len = cfg.chunk_size.min(items.len().saturating_sub(start));
    let bar = ProgressBar::new((chunk_len * cfg.models.len()) as u64);
    bar.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}",
        )?
        .progress_chars("##-"),
    );

    let progress_bar = bar.clone();
    let runner = runner.with_progress(move |result| {
        progress_bar.set_message(format!("{} #{}", result.model, result.item_index));
        progress_bar.inc(1);
    });

    let outcome = runner.run_chunk(&items, start).await;
    bar.finish_and_clear();

    match outcome? {
        ChunkOutcome::Complete => {
            println!("{}", "All items processed.".green());
            Ok(ExitCode::from(exit::NOTHING_TO_DO))
        }
        ChunkOutcome::Processed(report) => {
            let path = writer.write_chunk(&items, &report)?;

            let failed = report.failure_count();
            let unparseable = report
                .results
                .iter()
                .filter(|result| match &result.outcome {
                    ModelOutcome::Answered(text) => extract_numeric(text).is_none(),
                    ModelOutcome::Failed(_) => false,
                })
                .count();

            println!(
                "Processed items {}..{} of {} ({} calls, {} failed, {} without a single numeric answer)",
                report.start,
                report.next,
                items.len(),
                report.results.len(),
                if failed > 0 {
                    failed.to_string().red().to_string()
                } else {
                    failed.to_string()
                },
                unparseable,
            );
            println!("Report written to {}", path.display().to_string().cyan());

            if report.next >= items.len() {
                println!("{}", "That was the final chunk.".green());
            } else {
                println!("Next start index: {}", report.next);
            }
            Ok(ExitCode::from(exit::CHUNK_PROCESSED))
        }
    }
}
