//! LLM error types

use std::time::Duration;
use thiserror::Error;

use super::client::is_retryable_status;

/// Errors that can occur during LLM operations
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LlmError {
    /// Check if a request that failed this way is worth sending again
    ///
    /// Rate limits are surfaced to the caller with their `retry-after`
    /// instead of being retried here.
    pub fn is_retryable(&self) -> bool {
        match self {
            LlmError::ApiError { status, .. } => is_retryable_status(*status),
            LlmError::Network(_) | LlmError::Timeout(_) => true,
            LlmError::RateLimited { .. } | LlmError::InvalidResponse(_) | LlmError::Json(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_retryable() {
        assert!(
            LlmError::ApiError {
                status: 503,
                message: "Unavailable".to_string()
            }
            .is_retryable()
        );
        assert!(
            LlmError::ApiError {
                status: 408,
                message: "Request timeout".to_string()
            }
            .is_retryable()
        );

        // 4xx errors should not be retryable
        assert!(
            !LlmError::ApiError {
                status: 400,
                message: "Bad request".to_string()
            }
            .is_retryable()
        );

        assert!(LlmError::Timeout(Duration::from_secs(30)).is_retryable());
        assert!(!LlmError::InvalidResponse("Bad JSON".to_string()).is_retryable());
        assert!(
            !LlmError::RateLimited {
                retry_after: Duration::from_secs(60)
            }
            .is_retryable()
        );
    }
}
