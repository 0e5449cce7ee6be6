//! Tally core library
//!
//! This crate provides the core functionality for the tally evaluation
//! harness: dataset loading, the chunked batch evaluation driver, checkpoint
//! persistence, the chat completion client, and the CSV report sink.

pub mod checkpoint;
pub mod config;
pub mod dataset;
pub mod error;
pub mod extract;
pub mod interrupt;
pub mod llm;
pub mod report;
pub mod runner;

// Re-export commonly used types
pub use checkpoint::{CheckpointStore, FileCheckpointStore, MemoryCheckpointStore};
pub use config::{EvalConfig, ProviderConfig};
pub use dataset::{BenchmarkItem, load_examples};
pub use error::{TallyError, TallyResult};
pub use extract::extract_numeric;
pub use interrupt::{InterruptManager, InterruptReason};
pub use llm::{Answerer, ChatMessage, MessageRole, OllamaClient, build_prompt};
pub use report::CsvReportWriter;
pub use runner::{
    ChunkOutcome, ChunkReport, EvalRunner, EvaluationResult, ModelOutcome,
};
