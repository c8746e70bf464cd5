use std::future::Future;
use std::time::Duration;

use reqwest::{Response, StatusCode};

use crate::error::LlmError;

/// Retry schedule for embedding requests that hit rate limits or transient upstream
/// failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RetryPolicy {
    pub(crate) max_retries: u32,
    pub(crate) base_delay: Duration,
    pub(crate) max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt + 1`: doubling from `base_delay`, capped at
    /// `max_delay`.
    fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt.min(16)).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// A numeric `Retry-After` wins over the computed backoff, still capped.
    fn delay_for(&self, response: &Response, attempt: u32) -> Duration {
        response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<u64>().ok())
            .map_or_else(
                || self.backoff(attempt),
                |secs| Duration::from_secs(secs).min(self.max_delay),
            )
    }
}

fn is_transient(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS
        || matches!(
            status,
            StatusCode::INTERNAL_SERVER_ERROR
                | StatusCode::BAD_GATEWAY
                | StatusCode::SERVICE_UNAVAILABLE
                | StatusCode::GATEWAY_TIMEOUT
        )
}

/// Issue a request, retrying rate-limited (429) and transient 5xx responses.
///
/// Returns the first non-transient response. When retries run out, a 429 becomes
/// [`LlmError::RateLimited`] and a 5xx response is handed back for the caller to report.
///
/// # Errors
///
/// Transport failures surface as [`LlmError::Http`] without retrying.
pub(crate) async fn send_with_retry<F, Fut>(
    provider: &'static str,
    policy: RetryPolicy,
    mut send: F,
) -> Result<Response, LlmError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Response, reqwest::Error>>,
{
    let mut attempt = 0;
    loop {
        let response = send().await?;
        let status = response.status();
        if !is_transient(status) {
            return Ok(response);
        }
        if attempt >= policy.max_retries {
            if status == StatusCode::TOO_MANY_REQUESTS {
                return Err(LlmError::RateLimited);
            }
            return Ok(response);
        }

        let delay = policy.delay_for(&response, attempt);
        attempt += 1;
        tracing::warn!(
            provider,
            status = status.as_u16(),
            attempt,
            max_retries = policy.max_retries,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            "embedding request throttled or failed upstream, retrying"
        );
        tokio::time::sleep(delay).await;
    }
}
