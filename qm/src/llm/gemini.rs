//! Google Gemini API client implementation
//!
//! Calls `models/{model}:generateContent` with a JSON response MIME type so
//! the model returns the artifact object directly.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::client::{RetryPolicy, send_with_retry};
use super::{CompletionRequest, CompletionResponse, LlmClient, LlmError, StopReason, TokenUsage};
use crate::config::LlmConfig;

/// Gemini API client
pub struct GeminiClient {
    model: String,
    api_key: String,
    base_url: String,
    http: Client,
    max_tokens: u32,
    timeout: Duration,
    retry: RetryPolicy,
}

impl GeminiClient {
    /// Create a new client from configuration
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        debug!(model = %config.model, "GeminiClient::from_config: called");
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

    fn endpoint(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model)
    }

    /// Build the request body for the Gemini API
    fn build_request_body(&self, request: &CompletionRequest) -> serde_json::Value {
        debug!(%self.model, %request.max_tokens, "build_request_body: called");

        let mut generation_config = serde_json::json!({
            "temperature": request.temperature,
            "maxOutputTokens": request.max_tokens.min(self.max_tokens),
        });
        if request.json_response {
            generation_config["responseMimeType"] = serde_json::json!("application/json");
        }

        serde_json::json!({
            "contents": [{
                "role": "user",
                "parts": [{"text": request.prompt}],
            }],
            "generationConfig": generation_config,
        })
    }

    /// Parse the Gemini API response
    fn parse_response(&self, api_response: GeminiResponse) -> Result<CompletionResponse, LlmError> {
        debug!(candidates = api_response.candidates.len(), "parse_response: called");

        let usage = api_response
            .usage_metadata
            .map(|u| TokenUsage {
                input_tokens: u.prompt_token_count,
                output_tokens: u.candidates_token_count,
            })
            .unwrap_or_default();

        let Some(candidate) = api_response.candidates.into_iter().next() else {
            let reason = api_response
                .prompt_feedback
                .and_then(|f| f.block_reason)
                .unwrap_or_else(|| "no candidates returned".to_string());
            debug!(%reason, "parse_response: no candidates");
            return Err(LlmError::InvalidResponse(format!("Gemini returned no candidates: {}", reason)));
        };

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        let stop_reason = match candidate.finish_reason.as_deref() {
            Some("MAX_TOKENS") => StopReason::MaxTokens,
            Some("STOP") | None => StopReason::EndTurn,
            Some(other) => StopReason::Blocked(other.to_string()),
        };

        Ok(CompletionResponse {
            content: if text.is_empty() { None } else { Some(text) },
            stop_reason,
            usage,
        })
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        debug!(%self.model, %request.max_tokens, "complete: called");
        let url = self.endpoint();
        let body = self.build_request_body(&request);

        let api_response: GeminiResponse = send_with_retry(
            || {
                self.http
                    .post(&url)
                    .header("x-goog-api-key", &self.api_key)
                    .header("content-type", "application/json")
                    .json(&body)
            },
            self.timeout,
            &self.retry,
        )
        .await?;

        self.parse_response(api_response)
    }
}

// Gemini API response types

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    usage_metadata: Option<GeminiUsage>,
    prompt_feedback: Option<GeminiPromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Deserialize)]
struct GeminiPart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsage {
    #[serde(default)]
    prompt_token_count: u64,
    #[serde(default)]
    candidates_token_count: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPromptFeedback {
    block_reason: Option<String>,
}
