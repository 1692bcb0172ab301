//! Three-state circuit breaker, one instance per source.
//!
//! `closed -> open` after `failure_threshold` consecutive failures;
//! `open -> half-open` after `reset_timeout` monotonic seconds; `half-open`
//! resolves on the next recorded outcome.

use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Closed,
    Open,
    HalfOpen,
}

struct Inner {
    state: State,
    consecutive_failures: u32,
    tripped_at: Option<Instant>,
}

/// A circuit breaker guarding a single source. Cheap to check on every
/// scheduler call; all state lives behind a `Mutex` since schedulers may be
/// polled from multiple tasks.
pub struct CircuitBreaker {
    failure_threshold: u32,
    reset_timeout: Duration,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, reset_timeout: Duration) -> Self {
        CircuitBreaker {
            failure_threshold,
            reset_timeout,
            inner: Mutex::new(Inner {
                state: State::Closed,
                consecutive_failures: 0,
                tripped_at: None,
            }),
        }
    }

    pub fn default_params() -> Self {
        Self::new(5, Duration::from_secs(60))
    }

    /// Whether the breaker currently blocks calls. Transitions `open` to
    /// `half-open` and lets the caller through when the reset timeout has
    /// elapsed.
    pub fn is_open(&self) -> bool {
        let mut inner = self.inner.lock().unwrap();
        match inner.state {
            State::Closed => false,
            State::HalfOpen => false,
            State::Open => {
                let elapsed = inner
                    .tripped_at
                    .map(|t| t.elapsed())
                    .unwrap_or(Duration::ZERO);
                if elapsed >= self.reset_timeout {
                    inner.state = State::HalfOpen;
                    false
                } else {
                    true
                }
            }
        }
    }

    pub fn record_success(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.state = State::Closed;
        inner.consecutive_failures = 0;
        inner.tripped_at = None;
    }

    pub fn record_failure(&self) {
        let mut inner = self.inner.lock().unwrap();
        match inner.state {
            State::HalfOpen => {
                inner.state = State::Open;
                inner.tripped_at = Some(Instant::now());
            }
            State::Closed => {
                inner.consecutive_failures += 1;
                if inner.consecutive_failures >= self.failure_threshold {
                    inner.state = State::Open;
                    inner.tripped_at = Some(Instant::now());
                }
            }
            State::Open => {
                // Already open; a failure recorded while open just refreshes
                // the trip time so the reset window restarts.
                inner.tripped_at = Some(Instant::now());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_closed() {
        let b = CircuitBreaker::new(3, Duration::from_millis(50));
        assert!(!b.is_open());
    }

    #[test]
    fn opens_after_threshold_failures() {
        let b = CircuitBreaker::new(3, Duration::from_secs(60));
        b.record_failure();
        b.record_failure();
        assert!(!b.is_open());
        b.record_failure();
        assert!(b.is_open());
    }

    #[test]
    fn half_opens_after_reset_timeout_and_a_success_closes() {
        let b = CircuitBreaker::new(1, Duration::from_millis(20));
        b.record_failure();
        assert!(b.is_open());
        std::thread::sleep(Duration::from_millis(30));
        assert!(!b.is_open(), "should have transitioned to half-open");
        b.record_success();
        // still closed and counter reset
        b.record_failure();
        assert!(!b.is_open());
    }

    #[test]
    fn failure_in_half_open_reopens() {
        let b = CircuitBreaker::new(1, Duration::from_millis(20));
        b.record_failure();
        std::thread::sleep(Duration::from_millis(30));
        assert!(!b.is_open());
        b.record_failure();
        assert!(b.is_open());
    }

    #[test]
    fn success_in_closed_state_clears_counter() {
        let b = CircuitBreaker::new(3, Duration::from_secs(60));
        b.record_failure();
        b.record_failure();
        b.record_success();
        b.record_failure();
        b.record_failure();
        assert!(!b.is_open(), "counter should have reset after success");
    }
}
