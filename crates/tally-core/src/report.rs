//! CSV report sink
//!
//! One report file per chunk, named after the chunk's start index. Columns
//! are `input`, `expected`, then one column per configured model, in
//! configured order; the (item, model) slot mapping is explicit, never
//! inferred from the model name.

use crate::dataset::BenchmarkItem;
use crate::error::TallyResult;
use crate::runner::{ChunkReport, EvaluationResult, ModelOutcome};
use std::collections::HashMap;
use std::path::PathBuf;

/// CSV writer for chunk reports
pub struct CsvReportWriter {
    output_dir: PathBuf,
    models: Vec<String>,
}

impl CsvReportWriter {
    /// Create a writer targeting `output_dir` with one column per model
    pub fn new(output_dir: impl Into<PathBuf>, models: Vec<String>) -> Self {
        Self {
            output_dir: output_dir.into(),
            models,
        }
    }

    /// Path of the report for a chunk starting at `start`
    pub fn report_path(&self, start: usize) -> PathBuf {
        self.output_dir
            .join(format!("evaluation_results_{}.csv", start))
    }

    /// Write one chunk's rows.
    ///
    /// The file is replaced wholesale via temp-file-and-rename, so rerunning
    /// an interrupted chunk overwrites stale rows instead of appending.
    pub fn write_chunk(
        &self,
        items: &[BenchmarkItem],
        report: &ChunkReport,
    ) -> TallyResult<PathBuf> {
        std::fs::create_dir_all(&self.output_dir)?;

        let path = self.report_path(report.start);
        let tmp = path.with_extension("csv.tmp");

        let cells: HashMap<(usize, &str), &EvaluationResult> = report
            .results
            .iter()
            .map(|result| ((result.item_index, result.model.as_str()), result))
            .collect();

        let mut writer = csv::Writer::from_path(&tmp)?;

        let mut header = vec!["input".to_string(), "expected".to_string()];
        header.extend(self.models.iter().cloned());
        writer.write_record(&header)?;

        for (offset, item) in items[report.start..report.next].iter().enumerate() {
            let item_index = report.start + offset;
            let mut record = vec![item.input.clone(), item.target.clone()];
            for model in &self.models {
                let cell = cells
                    .get(&(item_index, model.as_str()))
                    .map(|result| render_outcome(&result.outcome))
                    .unwrap_or_default();
                record.push(cell);
            }
            writer.write_record(&record)?;
        }

        writer.flush()?;
        drop(writer);
        std::fs::rename(&tmp, &path)?;

        tracing::debug!(path = %path.display(), rows = report.items(), "report written");
        Ok(path)
    }
}

/// A flat file forces a string convention at the very edge; the tagged
/// outcome stays intact everywhere else.
fn render_outcome(outcome: &ModelOutcome) -> String {
    match outcome {
        ModelOutcome::Answered(text) => text.clone(),
        ModelOutcome::Failed(error) => format!("[error: {}]", error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn report_with(results: Vec<EvaluationResult>, start: usize, next: usize) -> ChunkReport {
        ChunkReport {
            start,
            next,
            results,
        }
    }

    #[test]
    fn test_report_path_is_named_after_start_index() {
        let writer = CsvReportWriter::new("/tmp/out", vec!["m1".to_string()]);
        assert_eq!(
            writer.report_path(40),
            PathBuf::from("/tmp/out/evaluation_results_40.csv")
        );
    }

    #[test]
    fn test_write_chunk() {
        let temp_dir = TempDir::new().unwrap();
        let items = vec![
            BenchmarkItem {
                input: "2+2?".to_string(),
                target: "4".to_string(),
            },
            BenchmarkItem {
                input: "apples, oranges: how many?".to_string(),
                target: "2".to_string(),
            },
        ];
        let results = vec![
            EvaluationResult {
                item_index: 0,
                model: "m1".to_string(),
                outcome: ModelOutcome::Answered("4".to_string()),
            },
            EvaluationResult {
                item_index: 0,
                model: "m2".to_string(),
                outcome: ModelOutcome::Failed("boom".to_string()),
            },
            EvaluationResult {
                item_index: 1,
                model: "m1".to_string(),
                outcome: ModelOutcome::Answered("two".to_string()),
            },
            EvaluationResult {
                item_index: 1,
                model: "m2".to_string(),
                outcome: ModelOutcome::Answered("2".to_string()),
            },
        ];

        let writer = CsvReportWriter::new(
            temp_dir.path(),
            vec!["m1".to_string(), "m2".to_string()],
        );
        let path = writer
            .write_chunk(&items, &report_with(results, 0, 2))
            .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert_eq!(lines.next(), Some("input,expected,m1,m2"));
        assert_eq!(lines.next(), Some("2+2?,4,4,[error: boom]"));
        // The comma-bearing input gets quoted by the csv layer
        assert_eq!(
            lines.next(),
            Some("\"apples, oranges: how many?\",2,two,2")
        );
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn test_write_chunk_offsets_rows_by_start() {
        let temp_dir = TempDir::new().unwrap();
        let items = vec![
            BenchmarkItem {
                input: "a".to_string(),
                target: "1".to_string(),
            },
            BenchmarkItem {
                input: "b".to_string(),
                target: "2".to_string(),
            },
        ];
        let results = vec![EvaluationResult {
            item_index: 1,
            model: "m1".to_string(),
            outcome: ModelOutcome::Answered("beta".to_string()),
        }];

        let writer = CsvReportWriter::new(temp_dir.path(), vec!["m1".to_string()]);
        let path = writer
            .write_chunk(&items, &report_with(results, 1, 2))
            .unwrap();

        assert!(path.ends_with("evaluation_results_1.csv"));
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "input,expected,m1\nb,2,beta\n");
    }

    #[test]
    fn test_rerun_overwrites_previous_report() {
        let temp_dir = TempDir::new().unwrap();
        let items = vec![BenchmarkItem {
            input: "q".to_string(),
            target: "a".to_string(),
        }];
        let writer = CsvReportWriter::new(temp_dir.path(), vec!["m1".to_string()]);

        let first = vec![EvaluationResult {
            item_index: 0,
            model: "m1".to_string(),
            outcome: ModelOutcome::Failed("first try".to_string()),
        }];
        writer
            .write_chunk(&items, &report_with(first, 0, 1))
            .unwrap();

        let second = vec![EvaluationResult {
            item_index: 0,
            model: "m1".to_string(),
            outcome: ModelOutcome::Answered("a".to_string()),
        }];
        let path = writer
            .write_chunk(&items, &report_with(second, 0, 1))
            .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(!content.contains("first try"));
        assert!(content.contains("q,a,a"));
    }
}
