//! OpenAI API client implementation
//!
//! Implements the LlmClient trait for OpenAI-compatible Chat Completions
//! endpoints, using JSON response mode for structured artifact output.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::client::{RetryPolicy, send_with_retry};
use super::{CompletionRequest, CompletionResponse, LlmClient, LlmError, StopReason, TokenUsage};
use crate::config::LlmConfig;

/// OpenAI API client
pub struct OpenAIClient {
    model: String,
    api_key: String,
    base_url: String,
    http: Client,
    max_tokens: u32,
    timeout: Duration,
    retry: RetryPolicy,
}

impl OpenAIClient {
    /// Create a new client from configuration
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        debug!(model = %config.model, "OpenAIClient::from_config: called");
        let api_key = config
            .get_api_key()
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        let timeout = config.timeout();

        let http = Client::builder().timeout(timeout).build().map_err(LlmError::Network)?;

        Ok(Self {
            model: config.model.clone(),
            api_key,
            base_url: config.effective_base_url(),
            http,
            max_tokens: config.max_tokens,
            timeout,
            retry: RetryPolicy::default(),
        })
    }

    /// Build the request body for the OpenAI API
    fn build_request_body(&self, request: &CompletionRequest) -> serde_json::Value {
        debug!(%self.model, %request.max_tokens, "build_request_body: called");

        let max_tokens = request.max_tokens.min(self.max_tokens);

        // GPT-5.x and o1/o3 models use max_completion_tokens instead of max_tokens
        let uses_completion_tokens =
            self.model.starts_with("gpt-5") || self.model.starts_with("o1") || self.model.starts_with("o3");

        let mut body = serde_json::json!({
            "model": self.model,
            "messages": [{
                "role": "user",
                "content": request.prompt,
            }],
            "temperature": request.temperature,
        });

        if uses_completion_tokens {
            body["max_completion_tokens"] = serde_json::json!(max_tokens);
        } else {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        if request.json_response {
            debug!("build_request_body: requesting json_object response format");
            body["response_format"] = serde_json::json!({"type": "json_object"});
        }

        body
    }

    /// Parse the OpenAI API response
    fn parse_response(&self, api_response: OpenAIResponse) -> CompletionResponse {
        debug!(choices = api_response.choices.len(), "parse_response: called");
        let (content, stop_reason) = match api_response.choices.into_iter().next() {
            Some(c) => {
                let stop_reason = match c.finish_reason.as_deref() {
                    Some("length") => StopReason::MaxTokens,
                    Some("content_filter") => StopReason::Blocked("content_filter".to_string()),
                    _ => StopReason::EndTurn,
                };
                (c.message.content, stop_reason)
            }
            None => (None, StopReason::EndTurn),
        };

        let usage = api_response
            .usage
            .map(|u| TokenUsage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
            })
            .unwrap_or_default();

        CompletionResponse {
            content,
            stop_reason,
            usage,
        }
    }
}

#[async_trait]
impl LlmClient for OpenAIClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        debug!(%self.model, %request.max_tokens, "complete: called");
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = self.build_request_body(&request);

        let api_response: OpenAIResponse = send_with_retry(
            || {
                self.http
                    .post(&url)
                    .header("Authorization", format!("Bearer {}", self.api_key))
                    .header("content-type", "application/json")
                    .json(&body)
            },
            self.timeout,
            &self.retry,
        )
        .await?;

        Ok(self.parse_response(api_response))
    }
}

// OpenAI API response types

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
    usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
}
