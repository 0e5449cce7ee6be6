//! Error types for the tally harness

use thiserror::Error;

/// Result type alias for tally operations
pub type TallyResult<T> = Result<T, TallyError>;

/// Main error type for the tally harness
#[derive(Error, Debug, Clone)]
pub enum TallyError {
    /// Configuration related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Dataset loading errors (fatal, abort before any processing)
    #[error("Dataset error: {0}")]
    Dataset(String),

    /// Chat completion call errors
    #[error("LLM error: {0}")]
    Llm(String),

    /// Checkpoint persistence errors
    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    /// Report sink errors
    #[error("Report error: {0}")]
    Report(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(String),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(String),

    /// Invalid input errors
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The run was interrupted before the chunk completed
    #[error("Run was interrupted")]
    Interrupted,
}

impl TallyError {
    /// Create a new configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a new dataset error
    pub fn dataset(message: impl Into<String>) -> Self {
        Self::Dataset(message.into())
    }

    /// Create a new LLM error
    pub fn llm(message: impl Into<String>) -> Self {
        Self::Llm(message.into())
    }

    /// Create a new checkpoint error
    pub fn checkpoint(message: impl Into<String>) -> Self {
        Self::Checkpoint(message.into())
    }

    /// Create a new report error
    pub fn report(message: impl Into<String>) -> Self {
        Self::Report(message.into())
    }

    /// Create a new invalid input error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }
}

impl From<std::io::Error> for TallyError {
    fn from(error: std::io::Error) -> Self {
        Self::Io(error.to_string())
    }
}

impl From<serde_json::Error> for TallyError {
    fn from(error: serde_json::Error) -> Self {
        Self::Json(error.to_string())
    }
}

impl From<reqwest::Error> for TallyError {
    fn from(error: reqwest::Error) -> Self {
        Self::Http(error.to_string())
    }
}

impl From<csv::Error> for TallyError {
    fn from(error: csv::Error) -> Self {
        Self::Report(error.to_string())
    }
}
