//! Retry wrapper triggered only by a distinguished rate-limit signal.
//!
//! Lives *inside* the scheduler's wrapped call so the circuit breaker only
//! ever observes a post-retry outcome and the rate limiters acquire once
//! per final attempt, never per intermediate attempt.

use rand::Rng;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{instrument, warn};

/// Marker error distinguishing "the backend told us to slow down" (HTTP
/// 429) from every other failure. Only this variant triggers a retry here;
/// callers pass through every other error unchanged.
#[derive(Debug, Clone)]
pub struct RateLimitSignal;

impl fmt::Display for RateLimitSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rate limited (HTTP 429)")
    }
}

impl std::error::Error for RateLimitSignal {}

/// An error that may or may not be the rate-limit signal.
#[derive(Debug)]
pub enum SourceError {
    RateLimited,
    Other(String),
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceError::RateLimited => write!(f, "rate limited (HTTP 429)"),
            SourceError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for SourceError {}

const MAX_ATTEMPTS: usize = 5;
const BASE_DELAY: Duration = Duration::from_secs(1);
const MAX_DELAY: Duration = Duration::from_secs(60);
const MAX_JITTER: Duration = Duration::from_secs(5);

/// Run `op` (which performs the actual backend call), retrying with
/// exponential backoff only when it returns `SourceError::RateLimited`.
/// Any other error or a success is returned immediately.
#[instrument(level = "debug", skip_all)]
pub async fn with_rate_limit_retry<T, F, Fut>(mut op: F) -> Result<T, SourceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, SourceError>>,
{
    let mut attempt = 0usize;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(SourceError::RateLimited) => {
                attempt += 1;
                if attempt >= MAX_ATTEMPTS {
                    warn!(attempt, "exhausted retries on rate-limit signal");
                    return Err(SourceError::RateLimited);
                }
                let mut delay = BASE_DELAY.saturating_mul(1 << (attempt - 1));
                if delay > MAX_DELAY {
                    delay = MAX_DELAY;
                }
                let jitter_ms = rand::rng().random_range(0..=MAX_JITTER.as_millis() as u64);
                let delay = delay + Duration::from_millis(jitter_ms);
                warn!(attempt, ?delay, "rate limited, backing off");
                sleep(delay).await;
            }
            Err(other) => return Err(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn succeeds_without_retry_on_first_success() {
        let calls = AtomicUsize::new(0);
        let result: Result<i32, SourceError> = with_rate_limit_retry(|| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(7) }
        })
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_on_rate_limit_then_succeeds() {
        let calls = AtomicUsize::new(0);
        let result: Result<&str, SourceError> = with_rate_limit_retry(|| {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(SourceError::RateLimited)
                } else {
                    Ok("done")
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn does_not_retry_non_rate_limit_errors() {
        let calls = AtomicUsize::new(0);
        let result: Result<i32, SourceError> = with_rate_limit_retry(|| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(SourceError::Other("boom".into())) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let calls = AtomicUsize::new(0);
        let result: Result<i32, SourceError> = with_rate_limit_retry(|| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(SourceError::RateLimited) }
        })
        .await;
        assert!(matches!(result, Err(SourceError::RateLimited)));
        assert_eq!(calls.load(Ordering::SeqCst), MAX_ATTEMPTS);
    }
}
