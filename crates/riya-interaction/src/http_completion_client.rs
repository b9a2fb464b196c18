//! HttpCompletionClient - calls the hosted completion function over HTTPS.
//!
//! The function takes `{ sessionOrUserId, messages, isBatch, isGuest }` and
//! answers `{ messages: [{ text }] }` or `{ error }`.
//! Configuration priority: `[completion]` in config.toml < RIYA_* environment variables.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use riya_core::completion::{CompletionClient, CompletionRequest, parse_completion_response};
use riya_core::config::CompletionConfig;
use riya_core::{Result, RiyaError};
use serde_json::Value;

/// Client for the hosted completion endpoint.
#[derive(Clone)]
pub struct HttpCompletionClient {
    client: Client,
    url: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl HttpCompletionClient {
    /// Creates a client for `url` with a per-request timeout.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| RiyaError::config(format!("Failed to build HTTP client: {err}")))?;
        Ok(Self {
            client,
            url: url.into(),
            api_key: None,
            timeout,
        })
    }

    /// Builds a client from the `[completion]` section.
    pub fn from_config(config: &CompletionConfig, timeout: Duration) -> Result<Self> {
        let url = config.url.clone().ok_or_else(|| {
            RiyaError::config(
                "completion.url is not set (config.toml [completion] url or RIYA_COMPLETION_URL)",
            )
        })?;
        Ok(Self::new(url, timeout)?.with_api_key(config.api_key.clone()))
    }

    /// Sets the bearer token sent with every request.
    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn send_request(&self, body: &CompletionRequest) -> Result<Value> {
        let mut request = self.client.post(&self.url).json(body);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await.map_err(|err| {
            if err.is_timeout() {
                RiyaError::Timeout {
                    seconds: self.timeout.as_secs(),
                }
            } else {
                RiyaError::transport(format!("Completion request failed: {err}"))
            }
        })?;

        let status = response.status();
        let body_text = response
            .text()
            .await
            .map_err(|err| RiyaError::transport(format!("Failed to read completion body: {err}")))?;

        if !status.is_success() {
            return Err(map_http_error(status, &body_text));
        }

        serde_json::from_str(&body_text)
            .map_err(|err| RiyaError::malformed(format!("Completion body is not JSON: {err}")))
    }
}

#[async_trait]
impl CompletionClient for HttpCompletionClient {
    async fn complete(&self, request: CompletionRequest) -> Result<Vec<String>> {
        tracing::debug!(
            "[Completion] POST {} ({} message(s), batch={}, guest={})",
            self.url,
            request.messages.len(),
            request.is_batch,
            request.is_guest
        );
        let body = self.send_request(&request).await?;
        let replies = parse_completion_response(&body)?;
        tracing::debug!("[Completion] {} repl(ies) received", replies.len());
        Ok(replies)
    }
}

/// Maps a non-success status to a backend error, preferring the body's
/// `error` field when the function sent one.
fn map_http_error(status: StatusCode, body: &str) -> RiyaError {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| value.get("error").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                status.to_string()
            } else {
                body.trim().to_string()
            }
        });
    RiyaError::backend(format!("HTTP {}: {}", status.as_u16(), message))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_error_prefers_error_field() {
        let err = map_http_error(StatusCode::TOO_MANY_REQUESTS, r#"{"error":"slow down"}"#);
        assert_eq!(err.to_string(), "Backend error: HTTP 429: slow down");
    }

    #[test]
    fn test_http_error_falls_back_to_body_then_status() {
        let err = map_http_error(StatusCode::BAD_GATEWAY, "upstream died\n");
        assert_eq!(err.to_string(), "Backend error: HTTP 502: upstream died");

        let err = map_http_error(StatusCode::INTERNAL_SERVER_ERROR, "");
        assert!(err.to_string().contains("500 Internal Server Error"));
    }

    #[test]
    fn test_from_config_requires_url() {
        let err = HttpCompletionClient::from_config(&CompletionConfig::default(), Duration::from_secs(5))
            .err()
            .unwrap();
        assert!(matches!(err, RiyaError::Config(_)));
    }

    #[test]
    fn test_from_config_carries_key() {
        let config = CompletionConfig {
            url: Some("https://chat.invalid/api".into()),
            api_key: Some("k".into()),
        };
        let client = HttpCompletionClient::from_config(&config, Duration::from_secs(5)).unwrap();
        assert_eq!(client.url(), "https://chat.invalid/api");
        assert_eq!(client.api_key.as_deref(), Some("k"));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transport_error() {
        // Port 9 (discard) on localhost is closed on CI machines
        let client =
            HttpCompletionClient::new("http://127.0.0.1:9/complete", Duration::from_secs(2)).unwrap();
        let err = client
            .complete(CompletionRequest::new("g-1", vec!["hi".into()], true))
            .await
            .unwrap_err();
        assert!(err.is_completion_failure());
    }
}
