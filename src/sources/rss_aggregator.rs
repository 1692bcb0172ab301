//! RSS-based search aggregator adapter.
//!
//! `GET https://<host>/rss/search?q={query}&hl={lang-tag}&gl=IN&ceid=IN:{lang}`,
//! `lang-tag` is `en-IN` for English and the bare ISO-639-1 code otherwise.
//! Responses are an RSS `<channel><item>` feed parsed with `quick-xml`.

use crate::models::ArticleRef;
use crate::reliability::retry::SourceError;
use crate::sources::{has_required_fields, parse_rss_timestamp, NewsSource};
use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;
use tracing::{debug, instrument, warn};

pub const SOURCE_NAME: &str = "rss-aggregator";
pub const MAX_QUERY_LENGTH: usize = 2000;
const AGGREGATOR_HOST: &str = "news-aggregator.example.org";

const SUPPORTED_LANGUAGES: [&str; 14] = [
    "en", "hi", "bn", "ta", "te", "mr", "gu", "kn", "ml", "or", "pa", "as", "ur", "ne",
];

pub struct RssAggregatorSource {
    client: OnceLock<reqwest::Client>,
    quota_exhausted: AtomicBool,
}

impl Default for RssAggregatorSource {
    fn default() -> Self {
        RssAggregatorSource {
            client: OnceLock::new(),
            quota_exhausted: AtomicBool::new(false),
        }
    }
}

impl RssAggregatorSource {
    pub fn new() -> Self {
        Self::default()
    }

    fn client(&self) -> &reqwest::Client {
        self.client.get_or_init(|| {
            reqwest::Client::builder()
                .user_agent("Mozilla/5.0 (compatible; HeatwatchIndia/1.0)")
                .build()
                .expect("reqwest client config is valid")
        })
    }

    fn lang_tag(language: &str) -> String {
        if language == "en" {
            "en-IN".to_string()
        } else {
            language.to_string()
        }
    }
}

#[async_trait]
impl NewsSource for RssAggregatorSource {
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
            "https://{host}/rss/search?q={q}&hl={hl}&gl=IN&ceid=IN:{lang}",
            host = AGGREGATOR_HOST,
            q = urlencoding::encode(query_string),
            hl = Self::lang_tag(language),
            lang = language,
        );

        let response = match self.client().get(&url).send().await {
            Ok(resp) => resp,
            Err(e) => {
                warn!(error = %e, "transport error calling rss-aggregator");
                return Ok(Vec::new());
            }
        };

        match response.status().as_u16() {
            401 => {
                warn!("rss-aggregator: invalid key");
                return Ok(Vec::new());
            }
            403 => {
                warn!("rss-aggregator: quota exhausted");
                self.quota_exhausted.store(true, Ordering::SeqCst);
                return Ok(Vec::new());
            }
            429 => return Err(SourceError::RateLimited),
            200 => {}
            other => {
                warn!(status = other, "rss-aggregator: unexpected status");
                return Ok(Vec::new());
            }
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, "failed reading rss-aggregator response body");
                return Ok(Vec::new());
            }
        };

        let items = parse_rss_items(&body);
        debug!(count = items.len(), "parsed rss-aggregator items");

        let refs = items
            .into_iter()
            .filter_map(|item| {
                if !has_required_fields(&item.title, &item.link, item.pub_date.as_deref()) {
                    return None;
                }
                let timestamp = parse_rss_timestamp(item.pub_date.as_deref().unwrap_or_default())?;
                Some(ArticleRef {
                    title: item.title,
                    url: item.link,
                    source_name: SOURCE_NAME.to_string(),
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

struct RssItem {
    title: String,
    link: String,
    pub_date: Option<String>,
}

/// Parse `<item>` elements out of an RSS document with `quick-xml`.
/// Malformed XML yields an empty list rather than propagating an error,
/// matching the adapter's never-fail contract.
fn parse_rss_items(xml: &str) -> Vec<RssItem> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut items = Vec::new();
    let mut buf = Vec::new();

    let mut in_item = false;
    let mut current_tag: Option<String> = None;
    let mut title = String::new();
    let mut link = String::new();
    let mut pub_date: Option<String> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                if name == "item" {
                    in_item = true;
                    title.clear();
                    link.clear();
                    pub_date = None;
                }
                current_tag = Some(name);
            }
            Ok(Event::Text(e)) if in_item => {
                let text = e.unescape().unwrap_or_default().to_string();
                match current_tag.as_deref() {
                    Some("title") => title.push_str(&text),
                    Some("link") => link.push_str(&text),
                    Some("pubDate") => pub_date = Some(pub_date.unwrap_or_default() + &text),
                    _ => {}
                }
            }
            Ok(Event::End(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                if name == "item" {
                    items.push(RssItem {
                        title: title.clone(),
                        link: link.clone(),
                        pub_date: pub_date.clone(),
                    });
                    in_item = false;
                }
                current_tag = None;
            }
            Ok(Event::Eof) => break,
            Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    items
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_items() {
        let xml = r#"<rss><channel>
            <item><title>Heatwave alert</title><link>https://example.com/a</link><pubDate>Tue, 06 May 2025 10:00:00 GMT</pubDate></item>
            <item><title>Another story</title><link>https://example.com/b</link><pubDate>Wed, 07 May 2025 09:00:00 GMT</pubDate></item>
        </channel></rss>"#;
        let items = parse_rss_items(xml);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "Heatwave alert");
        assert_eq!(items[0].link, "https://example.com/a");
    }

    #[test]
    fn malformed_xml_yields_empty_list_not_panic() {
        let xml = "<rss><channel><item><title>unterminated";
        let items = parse_rss_items(xml);
        assert!(items.is_empty());
    }

    #[test]
    fn lang_tag_for_english_is_en_in() {
        assert_eq!(RssAggregatorSource::lang_tag("en"), "en-IN");
        assert_eq!(RssAggregatorSource::lang_tag("hi"), "hi");
    }

    #[test]
    fn supports_all_fourteen_languages() {
        let source = RssAggregatorSource::new();
        for lang in crate::models::LANGUAGES {
            assert!(source.supports_language(lang));
        }
    }
}
