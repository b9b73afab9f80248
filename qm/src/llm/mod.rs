//! LLM Client module for QuestMaster
//!
//! The generative capability used to draft and repair artifacts. Two
//! providers are supported behind the [`LlmClient`] trait: Google Gemini and
//! OpenAI-compatible chat completions.

use std::sync::Arc;

use tracing::debug;

pub mod client;
mod error;
mod gemini;
mod openai;
mod types;

pub use client::{LlmClient, RetryPolicy};
pub use error::LlmError;
pub use gemini::GeminiClient;
pub use openai::OpenAIClient;
pub use types::{CompletionRequest, CompletionResponse, GenerationOptions, StopReason, TokenUsage};

use crate::config::LlmConfig;

/// Create an LLM client based on the provider specified in config
///
/// Supports "gemini" and "openai" providers.
pub fn create_client(config: &LlmConfig) -> Result<Arc<dyn LlmClient>, LlmError> {
    debug!(provider = %config.provider, model = %config.model, "create_client: called");
    match config.provider.as_str() {
        "gemini" => {
            debug!("create_client: creating Gemini client");
            Ok(Arc::new(GeminiClient::from_config(config)?))
        }
        "openai" => {
            debug!("create_client: creating OpenAI client");
            Ok(Arc::new(OpenAIClient::from_config(config)?))
        }
        other => {
            debug!(provider = %other, "create_client: unknown provider");
            Err(LlmError::InvalidResponse(format!(
                "Unknown LLM provider: '{}'. Supported: gemini, openai",
                other
            )))
        }
    }
}
