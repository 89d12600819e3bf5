//! Reasoning service.
//!
//! Turns a [`SystemSnapshot`] into a validated [`LlmResponse`]:
//! 1. [`generate_prompt`] renders a fixed instruction template around the snapshot
//! 2. A [`ChatClient`] sends it to an OpenAI-compatible API
//! 3. [`parse_response`] decodes the completion text
//! 4. [`validate_response`] converts it into typed actions
//!
//! Any failure is returned as a single [`ReasoningError`]; falling back is the
//! orchestrator's job.
//!
//! # Example
//!
//! ```
//! use appstore_orchestrator::reasoning::{parse_response, validate_response, OverallStatus};
//!
//! let raw = parse_response("```json\n{\"overall_status\": \"ALL_OK\"}\n```").unwrap();
//! let response = validate_response(raw).unwrap();
//! assert_eq!(response.overall_status, OverallStatus::AllOk);
//! ```

mod client;
mod parsing;
mod prompt;
mod types;

pub use client::{ClientConfig, OpenAiClient};
pub use parsing::{parse_response, validate_response};
pub use prompt::generate_prompt;
pub use types::{
    ActionKind, AnalysisItem, ComponentStatus, LlmResponse, OverallStatus, RawAction,
    RawAnalysisItem, RawLlmResponse, RecommendedAction,
};

use std::sync::Arc;

use async_trait::async_trait;

use crate::collector::SystemSnapshot;
use crate::error::ReasoningError;
use crate::traits::{ChatClient, HealthAnalyzer};

/// [`HealthAnalyzer`] backed by a chat-completion API.
pub struct ReasoningService {
    client: Arc<dyn ChatClient>,
}

impl ReasoningService {
    /// Create a service over `client`.
    #[must_use]
    pub fn new(client: Arc<dyn ChatClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HealthAnalyzer for ReasoningService {
    async fn analyze(&self, snapshot: &SystemSnapshot) -> Result<LlmResponse, ReasoningError> {
        let prompt = generate_prompt(snapshot)?;
        let text = self.client.complete(&prompt).await?;

        let raw = parse_response(&text).inspect_err(|e| {
            tracing::warn!(error = %e, response_chars = text.len(), "Unparseable reasoning response");
        })?;
        let response = validate_response(raw)?;

        tracing::debug!(
            overall_status = %response.overall_status,
            findings = response.analysis.len(),
            actions = response.recommended_actions.len(),
            "Reasoning response validated"
        );
        Ok(response)
    }
}
