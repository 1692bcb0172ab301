//! JSON REST API adapter with a daily quota, restricted to 8 Indic
//! languages plus English.
//!
//! `GET https://<host>/api/v4/search?apikey={key}&q={query}&lang={iso}&country=in&max=10`.
//! HTTP 403 marks the key as quota-exhausted for the remainder of the run.

use crate::models::ArticleRef;
use crate::reliability::retry::SourceError;
use crate::sources::{has_required_fields, parse_json_timestamp, NewsSource};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;
use tracing::{instrument, warn};

pub const SOURCE_NAME: &str = "json-api-B";
pub const MAX_QUERY_LENGTH: usize = 200;
const API_HOST: &str = "json-api-b.example.org";

const SUPPORTED_LANGUAGES: [&str; 9] = ["en", "hi", "bn", "ta", "te", "mr", "gu", "kn", "ml"];

pub struct JsonApiBSource {
    api_key: String,
    client: OnceLock<reqwest::Client>,
    quota_exhausted: AtomicBool,
}

impl JsonApiBSource {
    pub fn new(api_key: impl Into<String>) -> Self {
        JsonApiBSource {
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
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    pub_date: Option<String>,
    #[serde(default)]
    source_name: Option<String>,
}

#[async_trait]
impl NewsSource for JsonApiBSource {
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
        if !self.supports_language(language) {
            return Ok(Vec::new());
        }

        let url = format!(
            "https://{host}/api/v4/search?apikey={key}&q={q}&lang={lang}&country=in&max=10",
            host = API_HOST,
            key = urlencoding::encode(&self.api_key),
            q = urlencoding::encode(query_string),
            lang = language,
        );

        let response = match self.client().get(&url).send().await {
            Ok(resp) => resp,
            Err(e) => {
                warn!(error = %e, "transport error calling json-api-B");
                return Ok(Vec::new());
            }
        };

        match response.status().as_u16() {
            401 => {
                warn!("json-api-B: invalid key");
                return Ok(Vec::new());
            }
            403 => {
                warn!("json-api-B: quota exhausted");
                self.quota_exhausted.store(true, Ordering::SeqCst);
                return Ok(Vec::new());
            }
            429 => return Err(SourceError::RateLimited),
            200 => {}
            other => {
                warn!(status = other, "json-api-B: unexpected status");
                return Ok(Vec::new());
            }
        }

        let parsed: SearchResponse = match response.json().await {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, "failed decoding json-api-B response");
                return Ok(Vec::new());
            }
        };

        let refs = parsed
            .results
            .into_iter()
            .filter_map(|r| {
                if !has_required_fields(&r.title, &r.link, r.pub_date.as_deref()) {
                    return None;
                }
                let timestamp = parse_json_timestamp(r.pub_date.as_deref().unwrap_or_default())?;
                Some(ArticleRef {
                    title: r.title,
                    url: r.link,
                    source_name: r.source_name.unwrap_or_else(|| SOURCE_NAME.to_string()),
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
