//! Retry with exponential backoff for the readiness probe.
//!
//! Retries both transport failures and non-2xx responses: right after
//! the listener task is spawned the server may not accept connections
//! yet, and a load balancer in front of it could briefly answer 503.

use std::time::Duration;

/// Retry attempts after the initial request.
const MAX_RETRIES: u32 = 5;

/// Base delay between retries; doubles each attempt (100ms → 1.6s).
const BASE_DELAY_MS: u64 = 100;

/// Issue a request until it answers 2xx, with backoff in between. The
/// final attempt's outcome is returned as-is, so a last non-2xx
/// response surfaces to the caller rather than being swallowed.
pub(crate) async fn retry_request<F, Fut>(f: F) -> Result<reqwest::Response, reqwest::Error>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<reqwest::Response, reqwest::Error>>,
{
    for attempt in 0..MAX_RETRIES {
        match f().await {
            Ok(response) if response.status().is_success() => return Ok(response),
            Ok(response) => {
                tracing::debug!(status = %response.status(), "probe target not ready yet");
            }
            Err(err) => {
                tracing::debug!("probe request failed: {err}");
            }
        }
        let delay = Duration::from_millis(BASE_DELAY_MS * 2u64.pow(attempt));
        tokio::time::sleep(delay).await;
    }
    f().await
}
