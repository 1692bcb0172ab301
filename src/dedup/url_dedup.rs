//! Stage 1: URL canonicalization, so the same article linked two different
//! ways collapses to one key.
//!
//! Canonicalization lowercases scheme and host, strips a leading `www.`,
//! strips the fragment, drops tracking parameters from a fixed blocklist,
//! sorts whatever query parameters remain, and strips a trailing slash
//! (except on the bare root path). The result is idempotent:
//! `canonicalize(canonicalize(u)) == canonicalize(u)`.
//!
//! [`dedup_by_url`] groups articles by their canonical URL and keeps the
//! highest-[`Article::quality_score`] survivor per group.

use std::collections::HashMap;

use url::Url;

use crate::models::Article;

const TRACKING_PARAM_PREFIXES: &[&str] = &["utm_"];
const TRACKING_PARAM_EXACT: &[&str] = &[
    "fbclid",
    "gclid",
    "yclid",
    "msclkid",
    "_ga",
    "_gl",
    "ref",
    "source",
    "mc_cid",
    "mc_eid",
    "mkt_tok",
    "hsctatracking",
    "si",
    "__cft__",
    "__tn__",
];

fn is_tracking_param(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    TRACKING_PARAM_PREFIXES.iter().any(|p| lower.starts_with(p))
        || TRACKING_PARAM_EXACT.contains(&lower.as_str())
}

/// Canonicalize a URL for dedup-key purposes. Unparseable input is returned
/// unchanged rather than discarded, so it still participates in exact
/// string-equality dedup even if it can't be normalized further.
pub fn canonicalize(raw_url: &str) -> String {
    let Ok(mut url) = Url::parse(raw_url) else {
        return raw_url.to_string();
    };

    let scheme = url.scheme().to_ascii_lowercase();
    let _ = url.set_scheme(&scheme);

    if let Some(host) = url.host_str() {
        let lower = host.to_ascii_lowercase();
        let stripped = lower.strip_prefix("www.").unwrap_or(&lower).to_string();
        let _ = url.set_host(Some(&stripped));
    }

    url.set_fragment(None);

    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| !is_tracking_param(k))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    params.sort();

    if params.is_empty() {
        url.set_query(None);
    } else {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for (k, v) in &params {
            serializer.append_pair(k, v);
        }
        url.set_query(Some(&serializer.finish()));
    }

    let path = url.path().to_string();
    if path.len() > 1 && path.ends_with('/') {
        let trimmed = path.trim_end_matches('/').to_string();
        url.set_path(&trimmed);
    }

    url.to_string()
}

/// Keep one article per canonical URL, preferring the highest
/// [`Article::quality_score`] survivor. Order of surviving articles is not
/// guaranteed to match input order.
pub fn dedup_by_url(articles: Vec<Article>) -> Vec<Article> {
    let mut by_canonical: HashMap<String, Article> = HashMap::new();

    for candidate in articles {
        let key = canonicalize(&candidate.reference.url);
        match by_canonical.get(&key) {
            Some(existing) if existing.quality_score() >= candidate.quality_score() => {}
            _ => {
                by_canonical.insert(key, candidate);
            }
        }
    }

    by_canonical.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ist_now, ArticleRef};

    fn article(url: &str, full_text: Option<&str>) -> Article {
        let reference = ArticleRef {
            title: "Heatwave grips Rajasthan".into(),
            url: url.to_string(),
            source_name: "rss-aggregator".into(),
            timestamp: ist_now(),
            language: "en".into(),
            state: "Rajasthan".into(),
            district: None,
            search_term: "heatwave".into(),
        };
        match full_text {
            Some(text) => Article::with_text(reference, text.to_string()),
            None => Article::without_text(reference),
        }
    }

    #[test]
    fn lowercases_scheme_and_host() {
        let canon = canonicalize("HTTPS://Example.COM/Story");
        assert!(canon.starts_with("https://example.com"));
    }

    #[test]
    fn strips_www_prefix() {
        let canon = canonicalize("https://www.example.com/story");
        assert!(canon.contains("https://example.com"));
        assert!(!canon.contains("www."));
    }

    #[test]
    fn strips_fragment() {
        let canon = canonicalize("https://example.com/story#section-2");
        assert!(!canon.contains('#'));
    }

    #[test]
    fn strips_tracking_params_but_keeps_others() {
        let canon = canonicalize("https://example.com/story?id=42&utm_source=twitter&fbclid=abc");
        assert!(canon.contains("id=42"));
        assert!(!canon.contains("utm_source"));
        assert!(!canon.contains("fbclid"));
    }

    #[test]
    fn sorts_remaining_query_params() {
        let canon = canonicalize("https://example.com/story?b=2&a=1");
        let query_part = canon.split('?').nth(1).unwrap();
        assert_eq!(query_part, "a=1&b=2");
    }

    #[test]
    fn strips_trailing_slash_except_root() {
        assert!(!canonicalize("https://example.com/story/").ends_with('/'));
        assert!(canonicalize("https://example.com/").ends_with('/'));
    }

    #[test]
    fn is_idempotent() {
        let once = canonicalize("HTTPS://WWW.Example.com/Story/?utm_source=x&b=2&a=1#frag");
        let twice = canonicalize(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn keeps_higher_quality_survivor_on_collision() {
        let a = article("https://www.example.com/story?utm_source=x", None);
        let b = article("https://example.com/story", Some("full article body text"));
        let result = dedup_by_url(vec![a, b]);
        assert_eq!(result.len(), 1);
        assert!(result[0].full_text.is_some());
    }

    #[test]
    fn non_colliding_urls_are_all_kept() {
        let a = article("https://example.com/story-one", None);
        let b = article("https://example.com/story-two", None);
        let result = dedup_by_url(vec![a, b]);
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn equal_quality_keeps_first_seen() {
        let a = article("https://www.example.com/story/", None);
        let b = article("https://example.com/story", None);
        let result = dedup_by_url(vec![a, b]);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].reference.url, "https://www.example.com/story/");
    }
}
