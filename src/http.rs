//! JSON-over-HTTP calls with retry, shared by the embedding and completion
//! providers.
//!
//! # Retry Strategy
//!
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors and timeouts → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)
//!
//! # Errors
//!
//! | Failure | Error |
//! |---------|-------|
//! | attempt exceeded the client timeout | [`ClauseError::Timeout`] |
//! | 429, 5xx, network, unreadable body | [`ClauseError::TransientExternal`] |
//! | any other 4xx | [`ClauseError::Rejected`] |
//!
//! The client timeout bounds each attempt, not the whole call: with
//! `timeout_secs = 60` and `max_retries = 2` a call can take three timeouts
//! plus 3s of backoff before it fails.

use clause_harness_core::ClauseError;
use std::time::Duration;

/// Build a client whose timeout applies to each request attempt.
pub fn client(timeout_secs: u64) -> Result<reqwest::Client, ClauseError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| ClauseError::Config(format!("failed to build HTTP client: {}", e)))
}

/// POST `body` to `url` and decode the JSON response, retrying transient
/// failures up to `max_retries` times.
pub async fn post_json(
    client: &reqwest::Client,
    service: &str,
    url: &str,
    bearer: Option<&str>,
    body: &serde_json::Value,
    max_retries: u32,
) -> Result<serde_json::Value, ClauseError> {
    let mut last_err = None;

    for attempt in 0..=max_retries {
        if attempt > 0 {
            let delay = Duration::from_secs(1 << (attempt - 1).min(5));
            tracing::debug!(service, attempt, ?delay, "retrying request");
            tokio::time::sleep(delay).await;
        }

        let mut req = client.post(url).json(body);
        if let Some(key) = bearer {
            req = req.bearer_auth(key);
        }

        match req.send().await {
            Ok(response) => {
                let status = response.status();

                if status.is_success() {
                    return response
                        .json()
                        .await
                        .map_err(|e| request_error(service, url, e));
                }

                let body_text = response.text().await.unwrap_or_default();
                let msg = format!("{} API error {}: {}", service, status, body_text);

                if status.as_u16() == 429 || status.is_server_error() {
                    tracing::warn!(service, %status, attempt, "transient API error");
                    last_err = Some(ClauseError::TransientExternal(msg));
                    continue;
                }

                tracing::warn!(service, %status, "request rejected");
                return Err(ClauseError::Rejected(msg));
            }
            Err(e) => {
                tracing::warn!(service, attempt, error = %e, "request failed");
                last_err = Some(request_error(service, url, e));
            }
        }
    }

    Err(last_err.unwrap_or_else(|| {
        ClauseError::TransientExternal(format!("{} request failed after retries", service))
    }))
}

fn request_error(service: &str, url: &str, e: reqwest::Error) -> ClauseError {
    if e.is_timeout() {
        ClauseError::Timeout(format!("{} request: {}", service, e))
    } else if e.is_decode() {
        ClauseError::TransientExternal(format!(
            "{} returned an unreadable response: {}",
            service, e
        ))
    } else {
        ClauseError::TransientExternal(format!("{} connection error ({}): {}", service, url, e))
    }
}

/// Read the OpenAI API key from the environment.
pub fn openai_api_key() -> Result<String, ClauseError> {
    std::env::var("OPENAI_API_KEY")
        .map_err(|_| ClauseError::Config("OPENAI_API_KEY environment variable not set".to_string()))
}
