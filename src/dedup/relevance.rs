//! Stage 3: heat-term relevance scoring plus a high-recall exclusion
//! filter, run after title-similarity dedup.
//!
//! Scoring matches the English heat-term dictionary against
//! `lower(title + "\n" + full_text)` across the ten fixed categories,
//! regardless of the article's declared language — an article tagged as
//! non-English can still carry English terms (mixed-language coverage,
//! English loanwords, extraction picking up English boilerplate) and those
//! still count. `term_score = min(matched_terms / 3, 1)`,
//! `category_score = min(matched_categories / 2, 1)`, a `0.2` bonus if any
//! matched term appears in the title itself, combined as
//! `0.5 * term_score + 0.3 * category_score + title_bonus`. When the
//! article has no extracted body text but the title matched, the score is
//! floored at `0.3` rather than relying on the title match alone to carry
//! the full formula. The final score is capped at `1.0`, and is `0.0` if no
//! term matched at all.
//!
//! The exclusion filter only fires when the score is already low
//! (`< 0.05`) *and* an exclusion pattern matches — a high-recall design
//! that only removes the clearest false positives (e.g. "heat map"),
//! rather than risk silently dropping borderline-relevant coverage.

use crate::data::{exclusions, heat_terms};
use crate::models::{Article, CATEGORIES};

const TERM_SATURATION: f64 = 3.0;
const CATEGORY_SATURATION: f64 = 2.0;
const TITLE_BONUS: f64 = 0.2;
const TERM_WEIGHT: f64 = 0.5;
const CATEGORY_WEIGHT: f64 = 0.3;
const NO_TEXT_FLOOR: f64 = 0.3;
const EXCLUSION_SCORE_THRESHOLD: f64 = 0.05;

/// Score a single article against the English heat-term dictionary. Not
/// gated on `article.reference.language` — the dictionary match is what
/// determines relevance, not the declared language.
pub fn score_article(article: &Article) -> f64 {
    let title_lower = article.reference.title.to_lowercase();
    let body_lower = article
        .full_text
        .as_deref()
        .unwrap_or_default()
        .to_lowercase();
    let haystack = format!("{}\n{}", title_lower, body_lower);

    let mut matched_terms = 0usize;
    let mut matched_categories = 0usize;
    let mut title_matched = false;

    for category in CATEGORIES {
        let mut category_matched = false;
        for term in heat_terms::terms("en", category) {
            let term_lower = term.to_lowercase();
            if haystack.contains(&term_lower) {
                matched_terms += 1;
                category_matched = true;
                if title_lower.contains(&term_lower) {
                    title_matched = true;
                }
            }
        }
        if category_matched {
            matched_categories += 1;
        }
    }

    if matched_terms == 0 {
        return 0.0;
    }

    let term_score = (matched_terms as f64 / TERM_SATURATION).min(1.0);
    let category_score = (matched_categories as f64 / CATEGORY_SATURATION).min(1.0);
    let title_bonus = if title_matched { TITLE_BONUS } else { 0.0 };

    let mut raw = TERM_WEIGHT * term_score + CATEGORY_WEIGHT * category_score + title_bonus;

    if article.full_text.is_none() && title_matched {
        raw = raw.max(NO_TEXT_FLOOR);
    }

    raw.min(1.0)
}

/// Whether an article should be dropped by the high-recall exclusion
/// filter: only when its score is already near-zero and an exclusion
/// pattern matches the title-plus-body text.
pub fn is_excluded(article: &Article, score: f64) -> bool {
    if score >= EXCLUSION_SCORE_THRESHOLD {
        return false;
    }
    let haystack = format!(
        "{}\n{}",
        article.reference.title,
        article.full_text.as_deref().unwrap_or_default()
    );
    exclusions::exclusion_patterns()
        .iter()
        .any(|pattern| pattern.is_match(&haystack))
}

/// Score every article and drop the ones the exclusion filter rejects.
pub fn score_and_filter(articles: Vec<Article>) -> Vec<Article> {
    articles
        .into_iter()
        .filter_map(|article| {
            let score = score_article(&article);
            if is_excluded(&article, score) {
                None
            } else {
                Some(article.with_score(score))
            }
        })
        .collect()
}
