//! Per-second and rolling-window rate limiters, both backed by a monotonic
//! clock and an internal `tokio::sync::Mutex` so concurrent callers
//! serialise through the gate.

use rand::Rng;
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;

/// Minimum interval `1/max_rps` between successive `acquire()` returns,
/// with up to `jitter_s` seconds of additional random delay.
pub struct PerSecondLimiter {
    interval: Duration,
    jitter: Duration,
    last: Mutex<Option<Instant>>,
}

impl PerSecondLimiter {
    pub fn new(max_rps: f64, jitter_s: f64) -> Self {
        assert!(max_rps > 0.0, "max_rps must be positive");
        PerSecondLimiter {
            interval: Duration::from_secs_f64(1.0 / max_rps),
            jitter: Duration::from_secs_f64(jitter_s.max(0.0)),
            last: Mutex::new(None),
        }
    }

    pub async fn acquire(&self) {
        let mut last = self.last.lock().await;
        let now = Instant::now();
        if let Some(prev) = *last {
            let elapsed = now.duration_since(prev);
            if elapsed < self.interval {
                let jitter = if self.jitter.is_zero() {
                    Duration::ZERO
                } else {
                    let millis = rand::rng().random_range(0..=self.jitter.as_millis() as u64);
                    Duration::from_millis(millis)
                };
                sleep(self.interval - elapsed + jitter).await;
            }
        }
        *last = Some(Instant::now());
    }
}

/// Keeps a bounded list of the last `max_requests` acquisition timestamps.
/// When full, `acquire()` sleeps until the oldest timestamp falls out of
/// the window, then prunes and records the new one.
pub struct WindowLimiter {
    max_requests: usize,
    window: Duration,
    timestamps: Mutex<VecDeque<Instant>>,
}

const SAFETY_MARGIN: Duration = Duration::from_millis(50);

impl WindowLimiter {
    pub fn new(max_requests: usize, window_seconds: u64) -> Self {
        assert!(max_requests > 0, "max_requests must be positive");
        WindowLimiter {
            max_requests,
            window: Duration::from_secs(window_seconds),
            timestamps: Mutex::new(VecDeque::with_capacity(max_requests)),
        }
    }

    pub async fn acquire(&self) {
        let mut timestamps = self.timestamps.lock().await;
        let now = Instant::now();
        while let Some(&oldest) = timestamps.front() {
            if now.duration_since(oldest) >= self.window {
                timestamps.pop_front();
            } else {
                break;
            }
        }
        if timestamps.len() >= self.max_requests {
            let oldest = *timestamps.front().unwrap();
            let wait = self.window.saturating_sub(now.duration_since(oldest)) + SAFETY_MARGIN;
            sleep(wait).await;
            timestamps.pop_front();
        }
        timestamps.push_back(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant as StdInstant;

    #[tokio::test]
    async fn per_second_limiter_spaces_out_calls() {
        let limiter = PerSecondLimiter::new(20.0, 0.0); // 50ms interval
        let t0 = StdInstant::now();
        limiter.acquire().await;
        limiter.acquire().await;
        limiter.acquire().await;
        assert!(t0.elapsed() >= Duration::from_millis(90));
    }

    #[tokio::test]
    async fn window_limiter_allows_burst_up_to_max() {
        let limiter = WindowLimiter::new(3, 10);
        let t0 = StdInstant::now();
        limiter.acquire().await;
        limiter.acquire().await;
        limiter.acquire().await;
        // all three should be effectively immediate
        assert!(t0.elapsed() < Duration::from_millis(200));
    }

    #[tokio::test]
    async fn window_limiter_blocks_until_window_elapses() {
        let limiter = WindowLimiter::new(2, 1); // 2 requests per 1s window
        let t0 = StdInstant::now();
        limiter.acquire().await;
        limiter.acquire().await;
        limiter.acquire().await; // third must wait ~1s
        assert!(t0.elapsed() >= Duration::from_millis(900));
    }
}
