//! Source adapters: one per backend, each mapping a single free-tier news
//! API or feed onto the shared [`NewsSource`] contract.
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`rss_aggregator`] | RSS-based search aggregator, all 14 languages |
//! | [`json_api_a`] | JSON REST API with a daily quota, all 14 languages |
//! | [`json_api_b`] | JSON REST API with a daily quota, 8 Indic + English |
//!
//! Every adapter implements `search(query) -> Result<Vec<ArticleRef>, SourceError>`
//! and must never panic: transport, parse, and validation failures are
//! caught internally, logged, and turned into `Ok(vec![])`. The single
//! exception is an HTTP 429, which is turned into `Err(SourceError::RateLimited)`
//! so the scheduler's retry wrapper (`reliability::retry`) can back off and
//! reissue the request.

pub mod json_api_a;
pub mod json_api_b;
pub mod rss_aggregator;

use crate::models::{naive_as_ist, to_ist, ArticleRef};
use crate::reliability::retry::SourceError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[async_trait]
pub trait NewsSource: Send + Sync {
    fn name(&self) -> &'static str;

    /// Language codes this backend can be queried in.
    fn supported_languages(&self) -> &'static [&'static str];

    fn supports_language(&self, language: &str) -> bool {
        self.supported_languages().contains(&language)
    }

    /// Search a single backend for a query string. Never panics; transport
    /// and parse failures are caught and logged, yielding `Ok(vec![])`. A
    /// 429 response is the one case that surfaces as an `Err` so the
    /// scheduler can retry.
    async fn search(
        &self,
        query_string: &str,
        language: &str,
        state: &str,
        search_term: &str,
    ) -> Result<Vec<ArticleRef>, SourceError>;
}

/// Parse an ISO-8601-with-`Z` or RFC-style timestamp, interpreting a naive
/// (offset-less) result as UTC before converting to IST. Used by the JSON
/// backends, which document UTC as their naive-timestamp default.
pub fn parse_json_timestamp(raw: &str) -> Option<DateTime<chrono_tz::Tz>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(to_ist(dt.with_timezone(&Utc)));
    }
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(naive_as_ist_from_utc(naive));
    }
    None
}

/// Parse an RFC-2822-style timestamp (the RSS `pubDate` format), keeping
/// whatever offset the backend supplied instead of assuming UTC.
pub fn parse_rss_timestamp(raw: &str) -> Option<DateTime<chrono_tz::Tz>> {
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(to_ist(dt.with_timezone(&Utc)));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(to_ist(dt.with_timezone(&Utc)));
    }
    None
}

fn naive_as_ist_from_utc(naive: chrono::NaiveDateTime) -> DateTime<chrono_tz::Tz> {
    to_ist(DateTime::from_naive_utc_and_offset(naive, Utc))
}

/// Skip an entry missing any of {title, url, timestamp}; used by every
/// adapter's response mapper.
pub fn has_required_fields(title: &str, url: &str, timestamp: Option<&str>) -> bool {
    !title.trim().is_empty() && !url.trim().is_empty() && timestamp.is_some_and(|t| !t.trim().is_empty())
}
