//! Wraps a single [`NewsSource`] with the reliability stack: a circuit
//! breaker, an optional daily budget, a concurrency cap, and one or two
//! rate limiters. `execute()` never raises — every failure mode resolves to
//! a [`QueryResult`], success or otherwise.
//!
//! Check order on every call:
//! 1. circuit breaker open?
//! 2. daily budget exhausted?
//! 3. language supported?
//! 4. acquire concurrency permit, then per-second limiter, then window limiter
//! 5. call the source under the rate-limit retry wrapper
//! 6. increment the daily counter
//! 7. success -> record breaker success
//! 8. failure -> record breaker failure

use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::Semaphore;
use tracing::{instrument, warn};

use crate::models::{Query, QueryResult};
use crate::reliability::circuit_breaker::CircuitBreaker;
use crate::reliability::rate_limiter::{PerSecondLimiter, WindowLimiter};
use crate::reliability::retry::with_rate_limit_retry;
use crate::sources::NewsSource;

pub struct SourceScheduler {
    source: Box<dyn NewsSource>,
    breaker: Option<CircuitBreaker>,
    daily_limit: Option<usize>,
    daily_count: AtomicUsize,
    concurrency: Option<Semaphore>,
    per_second: Option<PerSecondLimiter>,
    window: Option<WindowLimiter>,
}

impl SourceScheduler {
    pub fn new(source: Box<dyn NewsSource>) -> Self {
        SourceScheduler {
            source,
            breaker: None,
            daily_limit: None,
            daily_count: AtomicUsize::new(0),
            concurrency: None,
            per_second: None,
            window: None,
        }
    }

    pub fn with_breaker(mut self, breaker: CircuitBreaker) -> Self {
        self.breaker = Some(breaker);
        self
    }

    pub fn with_daily_limit(mut self, limit: usize) -> Self {
        self.daily_limit = Some(limit);
        self
    }

    pub fn with_concurrency(mut self, permits: usize) -> Self {
        self.concurrency = Some(Semaphore::new(permits));
        self
    }

    pub fn with_per_second_limiter(mut self, limiter: PerSecondLimiter) -> Self {
        self.per_second = Some(limiter);
        self
    }

    pub fn with_window_limiter(mut self, limiter: WindowLimiter) -> Self {
        self.window = Some(limiter);
        self
    }

    pub fn source_name(&self) -> &'static str {
        self.source.name()
    }

    pub fn supported_languages(&self) -> &'static [&'static str] {
        self.source.supported_languages()
    }

    #[instrument(level = "debug", skip(self, query), fields(source = self.source.name(), region = %query.region_slug, lang = %query.language))]
    pub async fn execute(&self, query: Query) -> QueryResult {
        let source_name = self.source.name();

        if let Some(breaker) = &self.breaker {
            if breaker.is_open() {
                return QueryResult::ok_with_reason(query, source_name, "circuit breaker open");
            }
        }

        if let Some(limit) = self.daily_limit {
            if self.daily_count.load(Ordering::SeqCst) >= limit {
                return QueryResult::ok_with_reason(query, source_name, "daily budget exhausted");
            }
        }

        if !self.source.supports_language(&query.language) {
            return QueryResult::ok_with_reason(query, source_name, "unsupported language");
        }

        let _permit = match &self.concurrency {
            Some(sem) => match sem.acquire().await {
                Ok(permit) => Some(permit),
                Err(_) => None,
            },
            None => None,
        };
        if let Some(limiter) = &self.per_second {
            limiter.acquire().await;
        }
        if let Some(limiter) = &self.window {
            limiter.acquire().await;
        }

        let query_string = query.query_string.clone();
        let language = query.language.clone();
        let region_name = query.region_name.clone();

        let outcome = with_rate_limit_retry(|| {
            let q = query_string.clone();
            let lang = language.clone();
            let state = region_name.clone();
            let term = q.clone();
            async move { self.source.search(&q, &lang, &state, &term).await }
        })
        .await;

        self.daily_count.fetch_add(1, Ordering::SeqCst);

        match outcome {
            Ok(articles) => {
                if let Some(breaker) = &self.breaker {
                    breaker.record_success();
                }
                QueryResult::ok(query, source_name, articles)
            }
            Err(e) => {
                warn!(error = %e, "source call failed");
                if let Some(breaker) = &self.breaker {
                    breaker.record_failure();
                }
                QueryResult::failed(query, source_name, e.to_string())
            }
        }
    }
}
