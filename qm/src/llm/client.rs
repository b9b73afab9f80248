//! LlmClient trait definition

use std::time::Duration;

use async_trait::async_trait;
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::{CompletionRequest, CompletionResponse, LlmError};

/// Maximum number of retries for transient errors
const MAX_RETRIES: u32 = 3;

/// Initial backoff delay for retries
const INITIAL_BACKOFF_MS: u64 = 1000;

/// How often and how patiently transient failures are retried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    /// Doubled after every retry
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: MAX_RETRIES,
            initial_backoff: Duration::from_millis(INITIAL_BACKOFF_MS),
        }
    }
}

impl RetryPolicy {
    fn backoff(&self, attempt: u32) -> Duration {
        self.initial_backoff * 2u32.saturating_pow(attempt.saturating_sub(1))
    }
}

/// Stateless LLM client - each call is independent
///
/// This is the generative capability behind artifact generation and repair.
/// No conversation state is kept between calls; a repair round that needs
/// more context re-sends the full prompt.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send a single completion request (blocking until complete)
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;
}

/// Check if an HTTP status code is retryable
pub(crate) fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 500 | 502 | 503 | 504)
}

/// POST a request built by `build`, retrying transient failures
///
/// `build` is called once per attempt because a `RequestBuilder` cannot be
/// reused. A 429 is returned immediately as `RateLimited`; whether anything
/// else is retried is decided by `LlmError::is_retryable`.
pub(crate) async fn send_with_retry<T, F>(build: F, timeout: Duration, policy: &RetryPolicy) -> Result<T, LlmError>
where
    T: DeserializeOwned,
    F: Fn() -> RequestBuilder + Send + Sync,
{
    let mut attempt = 0;
    loop {
        if attempt > 0 {
            let backoff = policy.backoff(attempt);
            warn!(
                attempt,
                backoff_ms = backoff.as_millis() as u64,
                "send_with_retry: retrying after transient error"
            );
            tokio::time::sleep(backoff).await;
        }

        let error = match build().send().await {
            Ok(response) => {
                let status = response.status().as_u16();

                if status == 429 {
                    debug!("send_with_retry: rate limited (429)");
                    let retry_after = response
                        .headers()
                        .get("retry-after")
                        .and_then(|v| v.to_str().ok())
                        .and_then(|s| s.trim().parse::<u64>().ok())
                        .unwrap_or(60);

                    return Err(LlmError::RateLimited {
                        retry_after: Duration::from_secs(retry_after),
                    });
                }

                if response.status().is_success() {
                    debug!("send_with_retry: success");
                    let body = response.text().await?;
                    return Ok(serde_json::from_str(&body)?);
                }

                let message = response.text().await.unwrap_or_default();
                debug!(attempt, status, "send_with_retry: API error");
                LlmError::ApiError { status, message }
            }
            Err(e) if e.is_timeout() => {
                debug!(attempt, "send_with_retry: request timed out");
                LlmError::Timeout(timeout)
            }
            Err(e) => {
                debug!(attempt, error = %e, "send_with_retry: network error");
                LlmError::Network(e)
            }
        };

        if !error.is_retryable() || attempt >= policy.max_retries {
            return Err(error);
        }
        attempt += 1;
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    /// Raw HTTP/1.1 reply served by the stub
    fn reply(status: &str, extra_headers: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n{}\r\n{}",
            status,
            body.len(),
            extra_headers,
            body
        )
    }

    /// Read one request: headers, then `content-length` bytes of body
    async fn read_request(stream: &mut TcpStream) {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = stream.read(&mut chunk).await.unwrap();
            if n == 0 {
                return;
            }
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf).to_string();
            if let Some(end) = text.find("\r\n\r\n") {
                let length = text[..end]
                    .lines()
                    .find_map(|l| {
                        let (name, value) = l.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if buf.len() >= end + 4 + length {
                    return;
                }
            }
        }
    }

    /// Serve the scripted replies, one connection each; returns the URL and a hit counter
    async fn serve(replies: Vec<String>) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/v1/test", listener.local_addr().unwrap());
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        tokio::spawn(async move {
            for reply in replies {
                let (mut stream, _) = listener.accept().await.unwrap();
                read_request(&mut stream).await;
                counter.fetch_add(1, Ordering::SeqCst);
                stream.write_all(reply.as_bytes()).await.unwrap();
                stream.shutdown().await.ok();
            }
        });
        (url, hits)
    }

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            initial_backoff: Duration::from_millis(5),
        }
    }

    async fn post(url: &str, http: &reqwest::Client, policy: &RetryPolicy) -> Result<serde_json::Value, LlmError> {
        send_with_retry(
            || http.post(url).json(&serde_json::json!({"prompt": "quest"})),
            Duration::from_secs(5),
            policy,
        )
        .await
    }

    #[test]
    fn test_retryable_statuses() {
        assert!(is_retryable_status(500));
        assert!(is_retryable_status(503));
        assert!(is_retryable_status(408));
        assert!(!is_retryable_status(429));
        assert!(!is_retryable_status(400));
        assert!(!is_retryable_status(401));
    }

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(1), Duration::from_millis(1000));
        assert_eq!(policy.backoff(2), Duration::from_millis(2000));
        assert_eq!(policy.backoff(3), Duration::from_millis(4000));
    }

    #[tokio::test]
    async fn test_retries_server_error_then_succeeds() {
        let (url, hits) = serve(vec![
            reply("503 Service Unavailable", "", r#"{"error":"busy"}"#),
            reply("200 OK", "", r#"{"ok":true}"#),
        ])
        .await;

        let value = post(&url, &reqwest::Client::new(), &fast_policy(3)).await.unwrap();

        assert_eq!(value["ok"], true);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_rate_limit_is_surfaced_with_retry_after() {
        let (url, hits) = serve(vec![reply("429 Too Many Requests", "retry-after: 7\r\n", "{}")]).await;

        let err = post(&url, &reqwest::Client::new(), &fast_policy(3)).await.unwrap_err();

        match err {
            LlmError::RateLimited { retry_after } => assert_eq!(retry_after, Duration::from_secs(7)),
            other => panic!("expected RateLimited, got {:?}", other),
        }
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let (url, hits) = serve(vec![reply("400 Bad Request", "", r#"{"error":"bad key"}"#)]).await;

        let err = post(&url, &reqwest::Client::new(), &fast_policy(3)).await.unwrap_err();

        match err {
            LlmError::ApiError { status, message } => {
                assert_eq!(status, 400);
                assert!(message.contains("bad key"));
            }
            other => panic!("expected ApiError, got {:?}", other),
        }
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let busy = reply("503 Service Unavailable", "", "{}");
        let (url, hits) = serve(vec![busy.clone(), busy.clone(), busy]).await;

        let err = post(&url, &reqwest::Client::new(), &fast_policy(2)).await.unwrap_err();

        assert!(matches!(err, LlmError::ApiError { status: 503, .. }));
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_request_timeout_maps_to_timeout() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/v1/test", listener.local_addr().unwrap());
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            read_request(&mut stream).await;
            tokio::time::sleep(Duration::from_secs(5)).await;
        });
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(200))
            .build()
            .unwrap();

        let err = send_with_retry::<serde_json::Value, _>(
            || http.post(&url).body("{}"),
            Duration::from_millis(200),
            &fast_policy(0),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, LlmError::Timeout(d) if d == Duration::from_millis(200)));
    }
}
