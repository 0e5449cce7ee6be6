//! Batch evaluation driver
//!
//! Processes one chunk of the dataset per run: every item in
//! `[start, start + chunk_size)` is sent to every configured model in order,
//! one call in flight at a time. Failed calls are retried a bounded number
//! of times with a fixed delay; exhaustion records a failure outcome instead
//! of aborting the run. The checkpoint advances only after the whole chunk
//! is recorded, so a killed run is replayed from the same offset.

use crate::checkpoint::CheckpointStore;
use crate::config::EvalConfig;
use crate::dataset::BenchmarkItem;
use crate::error::{TallyError, TallyResult};
use crate::interrupt::InterruptManager;
use crate::llm::{Answerer, build_prompt};
use std::sync::Arc;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Result of one (item, model) call after retries settled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelOutcome {
    /// Raw response text, possibly tail-capped at `max_output_bytes`
    Answered(String),
    /// Final error text after every attempt failed
    Failed(String),
}

impl ModelOutcome {
    /// Whether this outcome records an exhausted-retries failure
    pub fn is_failure(&self) -> bool {
        matches!(self, ModelOutcome::Failed(_))
    }
}

/// One recorded (item, model) pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationResult {
    /// Position of the item in the dataset
    pub item_index: usize,
    /// Model that was asked
    pub model: String,
    /// What came back
    pub outcome: ModelOutcome,
}

/// What a single run produced
#[derive(Debug)]
pub enum ChunkOutcome {
    /// Every item is already processed; no calls were made
    Complete,
    /// One chunk was processed and the checkpoint advanced
    Processed(ChunkReport),
}

/// The processed chunk: its bounds and its ordered results
#[derive(Debug)]
pub struct ChunkReport {
    /// Index of the first item in the chunk
    pub start: usize,
    /// Index of the first unprocessed item after this chunk
    pub next: usize,
    /// One entry per (item, model) pair, item-major, in call order
    pub results: Vec<EvaluationResult>,
}

impl ChunkReport {
    /// Number of items covered by this chunk
    pub fn items(&self) -> usize {
        self.next - self.start
    }

    /// Number of calls that exhausted their retries
    pub fn failure_count(&self) -> usize {
        self.results
            .iter()
            .filter(|result| result.outcome.is_failure())
            .count()
    }
}

/// Callback invoked after each (item, model) pair is recorded
pub type ProgressFn = dyn Fn(&EvaluationResult) + Send + Sync;

/// The batch evaluation driver
pub struct EvalRunner {
    config: EvalConfig,
    answerer: Arc<dyn Answerer>,
    checkpoint: Arc<dyn CheckpointStore>,
    interrupts: InterruptManager,
    progress: Option<Box<ProgressFn>>,
}

impl EvalRunner {
    /// Create a new runner
    pub fn new(
        config: EvalConfig,
        answerer: Arc<dyn Answerer>,
        checkpoint: Arc<dyn CheckpointStore>,
    ) -> Self {
        Self {
            config,
            answerer,
            checkpoint,
            interrupts: InterruptManager::new(),
            progress: None,
        }
    }

    /// Attach an interrupt manager (e.g. wired to SIGINT)
    pub fn with_interrupts(mut self, interrupts: InterruptManager) -> Self {
        self.interrupts = interrupts;
        self
    }

    /// Attach a progress callback
    pub fn with_progress<F>(mut self, progress: F) -> Self
    where
        F: Fn(&EvaluationResult) + Send + Sync + 'static,
    {
        self.progress = Some(Box::new(progress));
        self
    }

    /// The runner's configuration
    pub fn config(&self) -> &EvalConfig {
        &self.config
    }

    /// Resolve the starting offset: an explicit override beats the stored
    /// checkpoint; a fresh store starts at 0.
    pub async fn resolve_start(&self, override_start: Option<usize>) -> TallyResult<usize> {
        match override_start {
            Some(start) => Ok(start),
            None => Ok(self.checkpoint.load().await?.unwrap_or(0)),
        }
    }

    /// Run a single chunk starting at `start`.
    ///
    /// Returns [`ChunkOutcome::Complete`] without touching the checkpoint or
    /// any model when `start` is already past the end of the dataset.
    /// Interruption surfaces as [`TallyError::Interrupted`] and leaves the
    /// checkpoint untouched.
    pub async fn run_chunk(
        &self,
        items: &[BenchmarkItem],
        start: usize,
    ) -> TallyResult<ChunkOutcome> {
        if start >= items.len() {
            info!(start, total = items.len(), "all items processed");
            return Ok(ChunkOutcome::Complete);
        }

        let end = (start + self.config.chunk_size).min(items.len());
        info!(
            start,
            end,
            models = self.config.models.len(),
            "processing chunk"
        );

        let mut results = Vec::with_capacity((end - start) * self.config.models.len());
        for (offset, item) in items[start..end].iter().enumerate() {
            let item_index = start + offset;
            let prompt = build_prompt(self.config.few_shot_preamble.as_deref(), &item.input);

            for model in &self.config.models {
                if self.interrupts.is_interrupted() {
                    warn!(item_index, %model, "interrupted; discarding partial chunk");
                    return Err(TallyError::Interrupted);
                }

                let outcome = self.call_with_retry(model, &prompt).await?;
                let result = EvaluationResult {
                    item_index,
                    model: model.clone(),
                    outcome,
                };
                if let Some(progress) = &self.progress {
                    progress(&result);
                }
                results.push(result);
            }
        }

        // The one checkpoint write of the run, after the full chunk
        self.checkpoint.save(end).await?;
        info!(next = end, "chunk complete");

        Ok(ChunkOutcome::Processed(ChunkReport {
            start,
            next: end,
            results,
        }))
    }

    /// One call with bounded fixed-delay retry.
    ///
    /// Exhaustion degrades to a recorded [`ModelOutcome::Failed`]; only
    /// interruption escapes as an error.
    async fn call_with_retry(&self, model: &str, prompt: &str) -> TallyResult<ModelOutcome> {
        let max_retries = self.config.max_retries;
        let mut last_error = None;

        for attempt in 0..=max_retries {
            if self.interrupts.is_interrupted() {
                return Err(TallyError::Interrupted);
            }

            match self.answerer.answer(model, prompt).await {
                Ok(output) => {
                    if attempt > 0 {
                        debug!(model, attempt, "call succeeded after retry");
                    }
                    return Ok(ModelOutcome::Answered(self.cap_output(output)));
                }
                Err(TallyError::Interrupted) => return Err(TallyError::Interrupted),
                Err(error) => {
                    warn!(
                        model,
                        attempt = attempt + 1,
                        max_attempts = max_retries + 1,
                        %error,
                        "call failed"
                    );
                    last_error = Some(error);

                    if attempt < max_retries {
                        self.wait_before_retry().await?;
                    }
                }
            }
        }

        let error = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "unknown error".to_string());
        warn!(model, "retries exhausted, recording failure");
        Ok(ModelOutcome::Failed(error))
    }

    /// Sleep the fixed retry delay, racing the interrupt token so Ctrl+C
    /// never waits out a pause.
    async fn wait_before_retry(&self) -> TallyResult<()> {
        let token = self.interrupts.token();
        tokio::select! {
            _ = token.cancelled() => Err(TallyError::Interrupted),
            _ = sleep(self.config.retry_delay) => Ok(()),
        }
    }

    /// Cap a response at `max_output_bytes`, keeping the tail: long outputs
    /// from reasoning models end with the answer.
    fn cap_output(&self, output: String) -> String {
        match self.config.max_output_bytes {
            Some(cap) if output.len() > cap => {
                let mut cut = output.len() - cap;
                while !output.is_char_boundary(cut) {
                    cut += 1;
                }
                output[cut..].to_string()
            }
            _ => output,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::MemoryCheckpointStore;
    use crate::config::ProviderConfig;
    use crate::interrupt::InterruptReason;
    use crate::llm::client::MockAnswerer;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn test_config(models: &[&str], chunk_size: usize, max_retries: u32) -> EvalConfig {
        EvalConfig {
            dataset: PathBuf::from("unused.json"),
            models: models.iter().map(|m| m.to_string()).collect(),
            few_shot_preamble: None,
            chunk_size,
            max_retries,
            retry_delay: Duration::from_secs(10),
            max_output_bytes: None,
            checkpoint_file: PathBuf::from("unused.txt"),
            output_dir: PathBuf::from("."),
            provider: ProviderConfig::default(),
        }
    }

    fn test_items(n: usize) -> Vec<BenchmarkItem> {
        (0..n)
            .map(|i| BenchmarkItem {
                input: format!("question {}", i),
                target: format!("{}", i),
            })
            .collect()
    }

    /// Answerer that replays a scripted sequence of responses
    struct ScriptedAnswerer {
        script: Mutex<VecDeque<Result<String, String>>>,
        calls: AtomicUsize,
    }

    impl ScriptedAnswerer {
        fn new(script: Vec<Result<String, String>>) -> Self {
            Self {
                script: Mutex::new(script.into_iter().collect()),
                calls: AtomicUsize::new(0),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Answerer for ScriptedAnswerer {
        async fn answer(&self, _model: &str, _prompt: &str) -> TallyResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.script.lock().unwrap().pop_front() {
                Some(Ok(text)) => Ok(text),
                Some(Err(message)) => Err(TallyError::llm(message)),
                None => Ok("ok".to_string()),
            }
        }
    }

    #[tokio::test]
    async fn test_single_item_single_model() {
        // The smallest complete run: one item, one model, no retries
        let mut answerer = MockAnswerer::new();
        answerer
            .expect_answer()
            .withf(|model, prompt| model == "m1" && prompt == "Q:2+2?\nA:")
            .times(1)
            .returning(|_, _| Ok("4".to_string()));

        let store = Arc::new(MemoryCheckpointStore::new());
        let runner = EvalRunner::new(
            test_config(&["m1"], 1, 0),
            Arc::new(answerer),
            store.clone(),
        );

        let items = vec![BenchmarkItem {
            input: "2+2?".to_string(),
            target: "4".to_string(),
        }];
        let outcome = runner.run_chunk(&items, 0).await.unwrap();

        match outcome {
            ChunkOutcome::Processed(report) => {
                assert_eq!(report.start, 0);
                assert_eq!(report.next, 1);
                assert_eq!(
                    report.results,
                    vec![EvaluationResult {
                        item_index: 0,
                        model: "m1".to_string(),
                        outcome: ModelOutcome::Answered("4".to_string()),
                    }]
                );
            }
            ChunkOutcome::Complete => panic!("expected a processed chunk"),
        }
        assert_eq!(store.load().await.unwrap(), Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_then_succeeds_with_fixed_delays() {
        // 3 failures then success: the success is recorded and exactly
        // 3 delays of the configured length were observed
        let answerer = Arc::new(ScriptedAnswerer::new(vec![
            Err("boom 1".to_string()),
            Err("boom 2".to_string()),
            Err("boom 3".to_string()),
            Ok("recovered".to_string()),
        ]));
        let store = Arc::new(MemoryCheckpointStore::new());
        let runner = EvalRunner::new(test_config(&["m1"], 1, 3), answerer.clone(), store);

        let started = tokio::time::Instant::now();
        let outcome = runner.run_chunk(&test_items(1), 0).await.unwrap();

        assert_eq!(started.elapsed(), Duration::from_secs(30));
        assert_eq!(answerer.call_count(), 4);
        match outcome {
            ChunkOutcome::Processed(report) => {
                assert_eq!(
                    report.results[0].outcome,
                    ModelOutcome::Answered("recovered".to_string())
                );
            }
            ChunkOutcome::Complete => panic!("expected a processed chunk"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retries_record_failure() {
        // R+1 consecutive failures degrade to a recorded outcome, the run
        // continues and the checkpoint still advances
        let answerer = Arc::new(ScriptedAnswerer::new(vec![
            Err("down".to_string()),
            Err("down".to_string()),
            Err("still down".to_string()),
        ]));
        let store = Arc::new(MemoryCheckpointStore::new());
        let runner = EvalRunner::new(test_config(&["m1"], 1, 2), answerer.clone(), store.clone());

        let outcome = runner.run_chunk(&test_items(1), 0).await.unwrap();

        assert_eq!(answerer.call_count(), 3);
        match outcome {
            ChunkOutcome::Processed(report) => {
                assert_eq!(report.failure_count(), 1);
                match &report.results[0].outcome {
                    ModelOutcome::Failed(message) => assert!(message.contains("still down")),
                    other => panic!("expected a failure, got {:?}", other),
                }
            }
            ChunkOutcome::Complete => panic!("expected a processed chunk"),
        }
        assert_eq!(store.load().await.unwrap(), Some(1));
    }

    #[tokio::test]
    async fn test_offset_past_end_is_complete() {
        let mut answerer = MockAnswerer::new();
        answerer.expect_answer().times(0);

        let store = Arc::new(MemoryCheckpointStore::new());
        store.save(5).await.unwrap();
        let runner = EvalRunner::new(test_config(&["m1"], 2, 0), Arc::new(answerer), store.clone());

        let outcome = runner.run_chunk(&test_items(5), 5).await.unwrap();
        assert!(matches!(outcome, ChunkOutcome::Complete));
        // No new checkpoint write
        assert_eq!(store.load().await.unwrap(), Some(5));
    }

    #[tokio::test]
    async fn test_chunk_is_item_major_in_model_order() {
        let answerer = Arc::new(ScriptedAnswerer::new(Vec::new()));
        let store = Arc::new(MemoryCheckpointStore::new());
        let runner = EvalRunner::new(test_config(&["m1", "m2"], 2, 0), answerer, store);

        let outcome = runner.run_chunk(&test_items(3), 0).await.unwrap();
        match outcome {
            ChunkOutcome::Processed(report) => {
                let order: Vec<(usize, &str)> = report
                    .results
                    .iter()
                    .map(|r| (r.item_index, r.model.as_str()))
                    .collect();
                assert_eq!(order, vec![(0, "m1"), (0, "m2"), (1, "m1"), (1, "m2")]);
            }
            ChunkOutcome::Complete => panic!("expected a processed chunk"),
        }
    }

    #[tokio::test]
    async fn test_chained_runs_visit_every_index_once() {
        let answerer = Arc::new(ScriptedAnswerer::new(Vec::new()));
        let store = Arc::new(MemoryCheckpointStore::new());
        let runner = EvalRunner::new(test_config(&["m1"], 2, 0), answerer, store);

        let items = test_items(5);
        let mut seen = Vec::new();
        let mut runs = 0;
        loop {
            let start = runner.resolve_start(None).await.unwrap();
            match runner.run_chunk(&items, start).await.unwrap() {
                ChunkOutcome::Processed(report) => {
                    runs += 1;
                    seen.extend(report.results.iter().map(|r| r.item_index));
                }
                ChunkOutcome::Complete => break,
            }
        }

        assert_eq!(runs, 3);
        assert_eq!(seen, vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_interrupt_skips_the_retry_delay() {
        // Interrupt lands during a retry pause: the run stops without
        // waiting out the sleep and without writing a checkpoint
        let interrupts = InterruptManager::new();

        struct FailThenInterrupt {
            interrupts: InterruptManager,
        }

        #[async_trait]
        impl Answerer for FailThenInterrupt {
            async fn answer(&self, _model: &str, _prompt: &str) -> TallyResult<String> {
                self.interrupts.interrupt(InterruptReason::UserInterrupt);
                Err(TallyError::llm("transient"))
            }
        }

        let store = Arc::new(MemoryCheckpointStore::new());
        let runner = EvalRunner::new(
            test_config(&["m1"], 1, 5),
            Arc::new(FailThenInterrupt {
                interrupts: interrupts.clone(),
            }),
            store.clone(),
        )
        .with_interrupts(interrupts);

        let started = tokio::time::Instant::now();
        let error = runner.run_chunk(&test_items(1), 0).await.unwrap_err();

        assert!(matches!(error, TallyError::Interrupted));
        assert_eq!(started.elapsed(), Duration::ZERO);
        assert_eq!(store.load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_interrupt_mid_chunk_leaves_checkpoint_untouched() {
        let interrupts = InterruptManager::new();
        let answerer = Arc::new(ScriptedAnswerer::new(Vec::new()));
        let store = Arc::new(MemoryCheckpointStore::new());

        let trigger = interrupts.clone();
        let runner = EvalRunner::new(test_config(&["m1"], 3, 0), answerer.clone(), store.clone())
            .with_interrupts(interrupts)
            .with_progress(move |result| {
                if result.item_index == 0 {
                    trigger.interrupt(InterruptReason::Manual);
                }
            });

        let error = runner.run_chunk(&test_items(3), 0).await.unwrap_err();

        assert!(matches!(error, TallyError::Interrupted));
        assert_eq!(answerer.call_count(), 1);
        assert_eq!(store.load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_resolve_start_precedence() {
        let answerer = Arc::new(ScriptedAnswerer::new(Vec::new()));
        let store = Arc::new(MemoryCheckpointStore::new());
        let runner = EvalRunner::new(test_config(&["m1"], 1, 0), answerer, store.clone());

        assert_eq!(runner.resolve_start(None).await.unwrap(), 0);
        store.save(7).await.unwrap();
        assert_eq!(runner.resolve_start(None).await.unwrap(), 7);
        assert_eq!(runner.resolve_start(Some(2)).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_output_cap_keeps_the_tail() {
        let answerer = Arc::new(ScriptedAnswerer::new(vec![Ok(format!(
            "{}the answer is 42",
            "x".repeat(100)
        ))]));
        let store = Arc::new(MemoryCheckpointStore::new());
        let mut config = test_config(&["m1"], 1, 0);
        config.max_output_bytes = Some(16);
        let runner = EvalRunner::new(config, answerer, store);

        let outcome = runner.run_chunk(&test_items(1), 0).await.unwrap();
        match outcome {
            ChunkOutcome::Processed(report) => {
                assert_eq!(
                    report.results[0].outcome,
                    ModelOutcome::Answered("the answer is 42".to_string())
                );
            }
            ChunkOutcome::Complete => panic!("expected a processed chunk"),
        }
    }

    #[tokio::test]
    async fn test_empty_output_is_a_success() {
        let answerer = Arc::new(ScriptedAnswerer::new(vec![Ok(String::new())]));
        let store = Arc::new(MemoryCheckpointStore::new());
        let runner = EvalRunner::new(test_config(&["m1"], 1, 0), answerer, store);

        let outcome = runner.run_chunk(&test_items(1), 0).await.unwrap();
        match outcome {
            ChunkOutcome::Processed(report) => {
                assert_eq!(
                    report.results[0].outcome,
                    ModelOutcome::Answered(String::new())
                );
                assert_eq!(report.failure_count(), 0);
            }
            ChunkOutcome::Complete => panic!("expected a processed chunk"),
        }
    }
}
