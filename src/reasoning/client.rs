//! OpenAI-compatible chat-completions client.
//!
//! One request per analysis, no retries: the next scheduled cycle is the
//! retry, and every failure sends the orchestrator down the fallback path.

#![allow(clippy::missing_errors_doc)]

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::{
    Config, SecretString, DEFAULT_MAX_COMPLETION_TOKENS, DEFAULT_REASONING_BASE_URL,
    DEFAULT_REASONING_MODEL, DEFAULT_REQUEST_TIMEOUT_MS,
};
use crate::error::ReasoningError;
use crate::traits::ChatClient;

/// Client configuration for the reasoning API.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL, without `/chat/completions`.
    pub base_url: String,
    /// Model name.
    pub model: String,
    /// `max_completion_tokens` per request.
    pub max_completion_tokens: u32,
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
}

impl ClientConfig {
    /// Create a new client configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the reasoning settings from process configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            base_url: config.reasoning_base_url.clone(),
            model: config.reasoning_model.clone(),
            max_completion_tokens: config.max_completion_tokens,
            timeout_ms: config.request_timeout_ms,
        }
    }

    /// Set base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set model.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set timeout in milliseconds.
    #[must_use]
    pub const fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_REASONING_BASE_URL.to_string(),
            model: DEFAULT_REASONING_MODEL.to_string(),
            max_completion_tokens: DEFAULT_MAX_COMPLETION_TOKENS,
            timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    max_completion_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Reasoning API client.
#[derive(Debug)]
pub struct OpenAiClient {
    client: Client,
    api_key: SecretString,
    config: ClientConfig,
}

impl OpenAiClient {
    /// Create a new client.
    pub fn new(api_key: SecretString, config: ClientConfig) -> Result<Self, ReasoningError> {
        let timeout = Duration::from_millis(config.timeout_ms);
        let client =
            Client::builder()
                .timeout(timeout)
                .build()
                .map_err(|e| ReasoningError::Network {
                    message: format!("Failed to create HTTP client: {e}"),
                })?;

        Ok(Self {
            client,
            api_key,
            config,
        })
    }

    /// Get the client configuration.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    async fn execute_once(&self, prompt: &str) -> Result<String, ReasoningError> {
        let url = format!("{}/chat/completions", self.config.base_url);
        let start = std::time::Instant::now();
        let request = ChatRequest {
            model: &self.config.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_completion_tokens: self.config.max_completion_tokens,
        };

        tracing::debug!(
            url = %url,
            model = %self.config.model,
            prompt_chars = prompt.len(),
            timeout_ms = self.config.timeout_ms,
            "Starting reasoning API request"
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.api_key.expose())
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                let elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
                if e.is_timeout() {
                    tracing::error!(url = %url, elapsed_ms, "Reasoning API request timed out");
                    ReasoningError::Timeout {
                        timeout_ms: self.config.timeout_ms,
                    }
                } else {
                    tracing::error!(url = %url, elapsed_ms, error = %e, "Reasoning API request failed");
                    ReasoningError::Network {
                        message: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        tracing::debug!(
            url = %url,
            status = %status,
            elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
            "Reasoning API response received"
        );

        if status.as_u16() == 401 {
            return Err(ReasoningError::AuthenticationFailed);
        }

        if status.as_u16() == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(60);
            return Err(ReasoningError::RateLimited {
                retry_after_seconds: retry_after,
            });
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ReasoningError::UnexpectedResponse {
                message: format!("Status {status}: {body}"),
            });
        }

        let body: ChatResponse =
            response
                .json()
                .await
                .map_err(|e| ReasoningError::UnexpectedResponse {
                    message: format!("Failed to parse response: {e}"),
                })?;

        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| ReasoningError::UnexpectedResponse {
                message: "response has no completion content".into(),
            })
    }
}

#[async_trait]
impl ChatClient for OpenAiClient {
    async fn complete(&self, prompt: &str) -> Result<String, ReasoningError> {
        self.execute_once(prompt).await
    }
}
