//! Evaluation run configuration
//!
//! All knobs the driver needs live in an explicit [`EvalConfig`] passed into
//! the runner, loaded from a JSON file with environment overrides for the
//! provider endpoint.

use crate::error::{TallyError, TallyResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default chat completion endpoint (local Ollama).
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_request_timeout() -> u64 {
    // Local models can take minutes per completion
    300
}

fn default_chunk_size() -> usize {
    20
}

fn default_max_retries() -> u32 {
    5
}

fn default_retry_delay() -> Duration {
    Duration::from_secs(10)
}

fn default_max_output_bytes() -> Option<usize> {
    Some(30_000)
}

fn default_checkpoint_file() -> PathBuf {
    PathBuf::from("checkpoint.txt")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

/// Connection settings for the chat completion endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Base URL of the OpenAI-compatible endpoint
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Bearer token, if the endpoint wants one (local endpoints usually don't)
    #[serde(default)]
    pub api_key: Option<String>,
    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            connect_timeout_secs: default_connect_timeout(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl ProviderConfig {
    /// Connection timeout as a duration
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Request timeout as a duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Apply `TALLY_BASE_URL` / `TALLY_API_KEY` environment overrides.
    ///
    /// Environment variables take priority over the config file.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(base_url) = std::env::var("TALLY_BASE_URL") {
            if !base_url.is_empty() {
                self.base_url = base_url;
            }
        }
        if let Ok(api_key) = std::env::var("TALLY_API_KEY") {
            if !api_key.is_empty() {
                self.api_key = Some(api_key);
            }
        }
    }

    /// Validate the provider configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.base_url.is_empty() {
            return Err("Provider base_url cannot be empty".to_string());
        }
        if self.connect_timeout_secs == 0 || self.request_timeout_secs == 0 {
            return Err("Provider timeouts must be positive".to_string());
        }
        Ok(())
    }
}

/// Configuration for an evaluation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalConfig {
    /// Path to the benchmark dataset (JSON, `{"examples": [...]}`)
    pub dataset: PathBuf,
    /// Models to evaluate, in the order their result columns appear
    pub models: Vec<String>,
    /// Optional few-shot preamble prepended to every prompt
    #[serde(default)]
    pub few_shot_preamble: Option<String>,
    /// Number of dataset items processed per run
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Additional attempts after a failed call
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Fixed pause between attempts (e.g. "10s")
    #[serde(with = "humantime_serde", default = "default_retry_delay")]
    pub retry_delay: Duration,
    /// Cap on recorded response length; the tail is kept because reasoning
    /// models put the answer at the end of long outputs
    #[serde(default = "default_max_output_bytes")]
    pub max_output_bytes: Option<usize>,
    /// File holding the index of the next unprocessed item
    #[serde(default = "default_checkpoint_file")]
    pub checkpoint_file: PathBuf,
    /// Directory for per-chunk CSV reports
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Chat completion endpoint settings
    #[serde(default)]
    pub provider: ProviderConfig,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            dataset: PathBuf::from("dataset.json"),
            models: vec!["llama3.2:1b".to_string(), "llama3.1:latest".to_string()],
            few_shot_preamble: None,
            chunk_size: default_chunk_size(),
            max_retries: default_max_retries(),
            retry_delay: default_retry_delay(),
            max_output_bytes: default_max_output_bytes(),
            checkpoint_file: default_checkpoint_file(),
            output_dir: default_output_dir(),
            provider: ProviderConfig::default(),
        }
    }
}

impl EvalConfig {
    /// Set the dataset path
    pub fn with_dataset(mut self, dataset: impl Into<PathBuf>) -> Self {
        self.dataset = dataset.into();
        self
    }

    /// Set the model list
    pub fn with_models<I, S>(mut self, models: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.models = models.into_iter().map(Into::into).collect();
        self
    }

    /// Set the chunk size
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Set the maximum retry count
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the delay between attempts
    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> TallyResult<()> {
        if self.chunk_size == 0 {
            return Err(TallyError::config("chunk_size must be positive"));
        }
        if self.models.is_empty() {
            return Err(TallyError::config("at least one model must be configured"));
        }
        for (i, model) in self.models.iter().enumerate() {
            if model.is_empty() {
                return Err(TallyError::config("model names cannot be empty"));
            }
            if self.models[..i].contains(model) {
                return Err(TallyError::config(format!(
                    "duplicate model '{}': each model gets exactly one result column",
                    model
                )));
            }
        }
        if self.max_retries > 10 {
            return Err(TallyError::config("max_retries should not exceed 10"));
        }
        self.provider.validate().map_err(TallyError::config)?;
        Ok(())
    }
}

/// Load configuration from a JSON file.
///
/// The file must exist; `tally config init` creates a template. Environment
/// overrides are applied after parsing.
pub fn load_from_file(path: &Path) -> TallyResult<EvalConfig> {
    if !path.exists() {
        return Err(TallyError::config(format!(
            "Config file '{}' not found (run `tally config init`)",
            path.display()
        )));
    }

    let content = std::fs::read_to_string(path).map_err(|e| {
        TallyError::config(format!(
            "Failed to read config file '{}': {}",
            path.display(),
            e
        ))
    })?;

    let mut config: EvalConfig = serde_json::from_str(&content).map_err(|e| {
        TallyError::config(format!(
            "Failed to parse config file '{}': {}",
            path.display(),
            e
        ))
    })?;

    config.provider.apply_env_overrides();
    Ok(config)
}
