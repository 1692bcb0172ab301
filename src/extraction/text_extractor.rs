//! Heuristic HTML-to-main-text extraction.
//!
//! Two passes: a favor-precision pass that only looks inside likely article
//! containers, and a favor-recall pass that falls back to every paragraph
//! in the document. Either pass is discarded if what it found is shorter
//! than [`MIN_TEXT_LENGTH`] characters after trimming, since a snippet that
//! short is more likely nav/boilerplate than a real article body.

use once_cell::sync::Lazy;
use scraper::{Html, Selector};

pub const MIN_TEXT_LENGTH: usize = 100;

const PRECISION_SELECTORS: &[&str] = &[
    "article",
    "[itemprop='articleBody']",
    ".article-body",
    ".story-body",
    ".post-content",
    "main",
];

const SKIP_TAGS: &[&str] = &["script", "style", "nav", "footer", "header", "aside"];

pub trait TextExtractor: Send + Sync {
    /// Best-effort extraction of the main body text from a page's raw
    /// HTML. Returns `None` if nothing long enough was found.
    fn extract(&self, html: &str) -> Option<String>;
}

#[derive(Default)]
pub struct HeuristicExtractor;

impl HeuristicExtractor {
    pub fn new() -> Self {
        HeuristicExtractor
    }

    fn favor_precision(&self, document: &Html) -> Option<String> {
        for selector_str in PRECISION_SELECTORS {
            let Ok(selector) = Selector::parse(selector_str) else {
                continue;
            };
            let text = document
                .select(&selector)
                .flat_map(|el| el.text())
                .collect::<Vec<_>>()
                .join(" ");
            let trimmed = collapse_whitespace(&text);
            if trimmed.len() >= MIN_TEXT_LENGTH {
                return Some(trimmed);
            }
        }
        None
    }

    fn favor_recall(&self, document: &Html) -> Option<String> {
        static P_SELECTOR: Lazy<Selector> =
            Lazy::new(|| Selector::parse("p").expect("p selector is valid"));
        let text = document
            .select(&P_SELECTOR)
            .filter(|el| !has_skip_ancestor(el))
            .flat_map(|el| el.text())
            .collect::<Vec<_>>()
            .join(" ");
        let trimmed = collapse_whitespace(&text);
        if trimmed.len() >= MIN_TEXT_LENGTH {
            Some(trimmed)
        } else {
            None
        }
    }
}

impl TextExtractor for HeuristicExtractor {
    fn extract(&self, html: &str) -> Option<String> {
        let document = Html::parse_document(html);
        self.favor_precision(&document)
            .or_else(|| self.favor_recall(&document))
    }
}

fn has_skip_ancestor(el: &scraper::ElementRef) -> bool {
    el.ancestors()
        .filter_map(scraper::ElementRef::wrap)
        .any(|ancestor| SKIP_TAGS.contains(&ancestor.value().name()))
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
