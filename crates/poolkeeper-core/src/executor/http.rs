//! Webhook-backed refresh executor.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};

use poolkeeper_types::RefreshOutcome;

use super::RefreshExecutor;
use crate::error::{AppError, AppResult};
use crate::failure::mask_account_id;

#[derive(Debug, Serialize)]
struct RefreshRequest<'a> {
    account_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    success: bool,
    #[serde(default)]
    error: Option<String>,
}

/// Delegates each refresh to an HTTP endpoint.
///
/// Sends `POST {url}` with `{"account_id": ...}` and expects
/// `{"success": bool, "error": "..."}` back. Transport errors, non-2xx
/// statuses and unreadable bodies all become failures.
#[derive(Debug, Clone)]
pub struct HttpRefreshExecutor {
    client: reqwest::Client,
    url: String,
}

impl HttpRefreshExecutor {
    pub fn new(
        url: impl Into<String>,
        headers: &BTreeMap<String, String>,
        timeout: Duration,
    ) -> AppResult<Self> {
        let mut default_headers = HeaderMap::new();
        for (name, value) in headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| AppError::Unknown(format!("invalid header name {name}: {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| AppError::Unknown(format!("invalid header value for {name}: {e}")))?;
            default_headers.insert(name, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(default_headers)
            .timeout(timeout)
            .build()?;
        Ok(Self { client, url: url.into() })
    }

    async fn call(&self, account_id: &str) -> Result<RefreshResponse, String> {
        let response = self
            .client
            .post(&self.url)
            .json(&RefreshRequest { account_id })
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    "timeout".to_string()
                } else {
                    format!("network error: {e}")
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(format!("executor returned HTTP {}: {}", status.as_u16(), body.trim()));
        }

        response.json::<RefreshResponse>().await.map_err(|e| format!("invalid executor response: {e}"))
    }
}

#[async_trait]
impl RefreshExecutor for HttpRefreshExecutor {
    async fn refresh(&self, account_id: &str) -> RefreshOutcome {
        let started = Instant::now();
        let result = self.call(account_id).await;
        let duration_seconds = started.elapsed().as_secs_f64();

        match result {
            Ok(RefreshResponse { success: true, .. }) => {
                RefreshOutcome::Success { duration_seconds }
            },
            Ok(RefreshResponse { success: false, error }) => RefreshOutcome::failure(
                error.filter(|e| !e.trim().is_empty()).unwrap_or_else(|| "refresh failed".to_string()),
                duration_seconds,
            ),
            Err(reason) => {
                tracing::debug!(
                    "[Executor] Webhook call for {} failed: {}",
                    mask_account_id(account_id),
                    reason
                );
                RefreshOutcome::failure(reason, duration_seconds)
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn executor(server: &MockServer) -> HttpRefreshExecutor {
        let mut headers = BTreeMap::new();
        headers.insert("x-api-key".to_string(), "secret".to_string());
        HttpRefreshExecutor::new(format!("{}/refresh", server.uri()), &headers, Duration::from_secs(5))
            .unwrap()
    }

    #[tokio::test]
    async fn test_success_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/refresh"))
            .and(header("x-api-key", "secret"))
            .and(body_json(serde_json::json!({"account_id": "acc-1"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"success": true})))
            .mount(&server)
            .await;

        let outcome = executor(&server).refresh("acc-1").await;
        assert!(outcome.is_success());
    }

    #[tokio::test]
    async fn test_reported_failure_keeps_reason() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                serde_json::json!({"success": false, "error": "verification code required"}),
            ))
            .mount(&server)
            .await;

        let outcome = executor(&server).refresh("acc-1").await;
        assert_eq!(outcome.failure_reason(), Some("verification code required"));
    }

    #[tokio::test]
    async fn test_http_error_status_is_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let outcome = executor(&server).refresh("acc-1").await;
        let reason = outcome.failure_reason().unwrap();
        assert!(reason.contains("502"), "{reason}");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_failure() {
        let exec = HttpRefreshExecutor::new(
            "http://127.0.0.1:9/refresh",
            &BTreeMap::new(),
            Duration::from_secs(2),
        )
        .unwrap();
        let outcome = exec.refresh("acc-1").await;
        assert!(!outcome.is_success());
    }
}
