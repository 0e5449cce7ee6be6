//! Benchmark dataset loading
//!
//! Datasets are JSON files in the BIG-bench task layout:
//! `{"examples": [{"input": "...", "target": "..."}, ...]}`. Items are
//! identified by their position in the list.

use crate::error::{TallyError, TallyResult};
use serde::de::{Deserializer, Error as _};
use serde::Deserialize;
use std::path::Path;

/// A single question/answer pair
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BenchmarkItem {
    /// The question text sent to the model
    pub input: String,
    /// The expected answer, as written in the dataset
    #[serde(deserialize_with = "string_or_number")]
    pub target: String,
}

#[derive(Deserialize)]
struct DatasetFile {
    examples: Vec<BenchmarkItem>,
}

/// Load the ordered example list from a dataset file.
///
/// Any failure here is fatal: a missing, unreadable, or malformed dataset
/// aborts the run before any model is called.
pub fn load_examples(path: &Path) -> TallyResult<Vec<BenchmarkItem>> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        TallyError::dataset(format!(
            "Failed to read dataset '{}': {}",
            path.display(),
            e
        ))
    })?;

    let file: DatasetFile = serde_json::from_str(&content).map_err(|e| {
        TallyError::dataset(format!(
            "Failed to parse dataset '{}': {}",
            path.display(),
            e
        ))
    })?;

    tracing::debug!(path = %path.display(), examples = file.examples.len(), "dataset loaded");
    Ok(file.examples)
}

/// Targets appear as strings or bare numbers depending on the task file.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(D::Error::custom(format!(
            "expected string or number target, got {}",
            other
        ))),
    }
}
