//! Chat completion client for OpenAI-compatible local endpoints

use crate::config::ProviderConfig;
use crate::error::{TallyError, TallyResult};
use crate::llm::messages::ChatMessage;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use tracing::instrument;

/// The seam between the evaluation driver and whatever answers prompts.
///
/// The driver only needs "ask `model` to answer `prompt`"; failures are
/// treated as transient and retried by the caller.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Answerer: Send + Sync {
    /// Ask `model` to answer `prompt`, returning the raw response text.
    async fn answer(&self, model: &str, prompt: &str) -> TallyResult<String>;
}

/// Chat client for an Ollama (or any OpenAI-compatible) endpoint
pub struct OllamaClient {
    config: ProviderConfig,
    http_client: Client,
}

impl OllamaClient {
    /// Create a new client with the configured timeouts
    pub fn new(config: ProviderConfig) -> TallyResult<Self> {
        let http_client = Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| TallyError::llm(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            config,
            http_client,
        })
    }

    /// Endpoint base URL
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }
}

#[async_trait]
impl Answerer for OllamaClient {
    #[instrument(skip(self, prompt), level = "debug")]
    async fn answer(&self, model: &str, prompt: &str) -> TallyResult<String> {
        let url = format!(
            "{}/v1/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );

        let request_body = json!({
            "model": model,
            "messages": [ChatMessage::user(prompt)],
        });

        let mut request = self
            .http_client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&request_body);

        // Local endpoints accept any token; send one only when configured
        if let Some(api_key) = &self.config.api_key {
            request = request.header("Authorization", format!("Bearer {}", api_key));
        }

        tracing::debug!(model, url = %url, "chat request");

        let response = request
            .send()
            .await
            .map_err(|e| TallyError::llm(format!("Chat request to '{}' failed: {}", model, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(TallyError::llm(format!(
                "Chat API error (status {}): {}",
                status, error_text
            )));
        }

        let response_json: Value = response
            .json()
            .await
            .map_err(|e| TallyError::llm(format!("Failed to parse chat response: {}", e)))?;

        let content = response_json
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                TallyError::llm("Chat response missing choices[0].message.content")
            })?;

        Ok(content.to_string())
    }
}
