//! LLM request/response types
//!
//! Provider-agnostic: one prompt in, one text out. Artifact generation and
//! repair are single-shot calls with no conversation state.

use tracing::debug;

use crate::config::LlmConfig;

/// Fixed generation options shared by every call in a session
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationOptions {
    /// Sampling temperature
    pub temperature: f32,

    /// Ask the provider for a structured JSON response
    pub json_response: bool,

    /// Max tokens for the response
    pub max_tokens: u32,
}

impl GenerationOptions {
    /// Options for structured artifact calls, taken from config
    pub fn from_config(config: &LlmConfig) -> Self {
        Self {
            temperature: config.temperature,
            json_response: true,
            max_tokens: config.max_tokens,
        }
    }
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self::from_config(&LlmConfig::default())
    }
}

/// A completion request - everything needed for one LLM call
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Full prompt text
    pub prompt: String,

    /// Sampling temperature
    pub temperature: f32,

    /// Request structured JSON output
    pub json_response: bool,

    /// Max tokens for response
    pub max_tokens: u32,
}

impl CompletionRequest {
    /// Build a request for `prompt` with the given options
    pub fn new(prompt: impl Into<String>, options: &GenerationOptions) -> Self {
        let prompt = prompt.into();
        debug!(prompt_len = prompt.len(), ?options, "CompletionRequest::new: called");
        Self {
            prompt,
            temperature: options.temperature,
            json_response: options.json_response,
            max_tokens: options.max_tokens,
        }
    }
}

/// Why the model stopped generating
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StopReason {
    #[default]
    EndTurn,
    MaxTokens,
    /// Provider-side filtering or other refusal
    Blocked(String),
}

/// Token usage statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// Response from a completion request
#[derive(Debug, Clone, Default)]
pub struct CompletionResponse {
    /// Text content (if any)
    pub content: Option<String>,

    /// Why generation stopped
    pub stop_reason: StopReason,

    /// Token usage for this call
    pub usage: TokenUsage,
}

impl CompletionResponse {
    /// A plain text response
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Default::default()
        }
    }

    /// The text content, trimmed, or an empty string
    pub fn text_or_empty(&self) -> &str {
        self.content.as_deref().map(str::trim).unwrap_or("")
    }
}
