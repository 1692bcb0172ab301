//! JSON REST API adapter with a daily quota, all 14 languages.
//!
//! `GET https://<host>/api/1/latest?apikey={key}&q={query}&language={iso}&country=in`.
//! A `200` response carrying `{"status":"error"}` is treated as a
//! failure-empty result, matching the backend's documented error shape.
//! HTTP 403 marks the key as quota-exhausted for the remainder of the run.

use crate::models::ArticleRef;
use crate::reliability::retry::SourceError;
use crate::sources::{has_required_fields, parse_json_timestamp, NewsSource};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;
use tracing::{instrument, warn};

pub const SOURCE_NAME: &str = "json-api-A";
pub const MAX_QUERY_LENGTH: usize = 512;
const API_HOST: &str = "json-api-a.example.org";

const SUPPORTED_LANGUAGES: [&str; 14] = [
    "en", "hi", "bn", "ta", "te", "mr", "gu", "kn", "ml", "or", "pa", "as", "ur", "ne",
];

pub struct JsonApiASource {
    api_key: String,
    client: OnceLock<reqwest::Client>,
    quota_exhausted: AtomicBool,
}

impl JsonApiASource {
    pub fn new(api_key: impl Into<String>) -> Self {
        JsonApiASource {
            api_key: api_key.into(),
            client: OnceLock::new(),
            quota_exhausted: AtomicBool::new(false),
        }
    }

    fn client(&self) -> &reqwest::Client {
        self.client.get_or_init(|| {
            reqwest::Client::builder()
                .build()
                .expect("reqwest client config is valid")
        })
    }
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    articles: Vec<ApiArticle>,
}

#[derive(Debug, Deserialize)]
struct ApiArticle {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    published_at: Option<String>,
    #[serde(default)]
    source: Option<String>,
}

#[async_trait]
impl NewsSource for JsonApiASource {
    fn name(&self) -> &'static str {
        SOURCE_NAME
    }

    fn supported_languages(&self) -> &'static [&'static str] {
        &SUPPORTED_LANGUAGES
    }

    #[instrument(level = "debug", skip(self), fields(source = SOURCE_NAME, %language, %state))]
    async fn search(
        &self,
        query_string: &str,
        language: &str,
        state: &str,
        search_term: &str,
    ) -> Result<Vec<ArticleRef>, SourceError> {
        if self.quota_exhausted.load(Ordering::SeqCst) {
            return Ok(Vec::new());
        }

        let url = format!(
            "https://{host}/api/1/latest?apikey={key}&q={q}&language={lang}&country=in",
            host = API_HOST,
            key = urlencoding::encode(&self.api_key),
            q = urlencoding::encode(query_string),
            lang = language,
        );

        let response = match self.client().get(&url).send().await {
            Ok(resp) => resp,
            Err(e) => {
                warn!(error = %e, "transport error calling json-api-A");
                return Ok(Vec::new());
            }
        };

        match response.status().as_u16() {
            401 => {
                warn!("json-api-A: invalid key");
                return Ok(Vec::new());
            }
            403 => {
                warn!("json-api-A: quota exhausted");
                self.quota_exhausted.store(true, Ordering::SeqCst);
                return Ok(Vec::new());
            }
            429 => return Err(SourceError::RateLimited),
            200 => {}
            other => {
                warn!(status = other, "json-api-A: unexpected status");
                return Ok(Vec::new());
            }
        }

        let parsed: ApiResponse = match response.json().await {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, "failed decoding json-api-A response");
                return Ok(Vec::new());
            }
        };

        if parsed.status.as_deref() == Some("error") {
            warn!("json-api-A: backend reported status=error");
            return Ok(Vec::new());
        }

        let refs = parsed
            .articles
            .into_iter()
            .filter_map(|a| {
                if !has_required_fields(&a.title, &a.url, a.published_at.as_deref()) {
                    return None;
                }
                let timestamp = parse_json_timestamp(a.published_at.as_deref().unwrap_or_default())?;
                Some(ArticleRef {
                    title: a.title,
                    url: a.url,
                    source_name: a.source.unwrap_or_else(|| SOURCE_NAME.to_string()),
                    timestamp,
                    language: language.to_string(),
                    state: state.to_string(),
                    district: None,
                    search_term: search_term.to_string(),
                })
            })
            .collect();

        Ok(refs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_error_response_is_treated_as_empty() {
        let raw = r#"{"status":"error","articles":[]}"#;
        let parsed: ApiResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.status.as_deref(), Some("error"));
    }

    #[test]
    fn missing_fields_are_skipped_by_has_required_fields() {
        let a = ApiArticle {
            title: "".into(),
            url: "https://x".into(),
            published_at: Some("2025-01-01T00:00:00Z".into()),
            source: None,
        };
        assert!(!has_required_fields(&a.title, &a.url, a.published_at.as_deref()));
    }

    #[test]
    fn supports_all_fourteen_languages() {
        let source = JsonApiASource::new("key");
        for lang in crate::models::LANGUAGES {
            assert!(source.supports_language(lang));
        }
    }
}
