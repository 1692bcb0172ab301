//! Stage 2: language-bucketed title-similarity clustering.
//!
//! Titles are compared within a language bucket only (the same story in two
//! languages is not a duplicate here — relevance scoring and the output
//! layer handle that). A publisher suffix like `" - The Times of India"` is
//! stripped before comparing as long as the suffix itself is 40 characters
//! or fewer, so it doesn't mask a real similarity match. Similarity is a
//! Ratcliff/Obershelp-style ratio over Unicode code points: twice the total
//! length of matching runs divided by the combined length of both titles.

use std::collections::HashMap;

use crate::models::Article;

pub const SIMILARITY_THRESHOLD: f64 = 0.85;
const MAX_SUFFIX_LENGTH: usize = 40;

fn strip_suffix(title: &str) -> &str {
    if let Some(pos) = title.rfind(" - ") {
        let suffix = &title[pos + 3..];
        if !suffix.is_empty() && suffix.chars().count() <= MAX_SUFFIX_LENGTH {
            return &title[..pos];
        }
    }
    title
}

fn normalize(title: &str) -> String {
    strip_suffix(title).trim().to_lowercase()
}

/// Ratcliff/Obershelp ratio: `2 * matching_chars / (len(a) + len(b))`,
/// computed on Unicode code points rather than bytes so multi-byte scripts
/// aren't double-counted.
pub fn similarity_ratio(a: &str, b: &str) -> f64 {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    if a_chars.is_empty() && b_chars.is_empty() {
        return 1.0;
    }
    let total = a_chars.len() + b_chars.len();
    if total == 0 {
        return 1.0;
    }
    let matched = matching_chars(&a_chars, &b_chars);
    2.0 * matched as f64 / total as f64
}

fn matching_chars(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let (len, a_pos, b_pos) = longest_common_substring(a, b);
    if len == 0 {
        return 0;
    }
    len + matching_chars(&a[..a_pos], &b[..b_pos])
        + matching_chars(&a[a_pos + len..], &b[b_pos + len..])
}

fn longest_common_substring(a: &[char], b: &[char]) -> (usize, usize, usize) {
    let mut best_len = 0;
    let mut best_a = 0;
    let mut best_b = 0;
    let mut prev_row = vec![0usize; b.len() + 1];

    for i in 0..a.len() {
        let mut row = vec![0usize; b.len() + 1];
        for j in 0..b.len() {
            if a[i] == b[j] {
                row[j + 1] = prev_row[j] + 1;
                if row[j + 1] > best_len {
                    best_len = row[j + 1];
                    best_a = i + 1 - best_len;
                    best_b = j + 1 - best_len;
                }
            }
        }
        prev_row = row;
    }

    (best_len, best_a, best_b)
}

/// Cluster articles by near-duplicate title within each language bucket,
/// keeping the highest [`Article::quality_score`] survivor from each
/// cluster. Order of surviving articles is not guaranteed to match input
/// order.
pub fn dedup_titles(articles: Vec<Article>) -> Vec<Article> {
    let mut buckets: HashMap<String, Vec<Article>> = HashMap::new();
    for article in articles {
        buckets
            .entry(article.reference.language.clone())
            .or_default()
            .push(article);
    }

    let mut kept = Vec::new();
    for (_, bucket) in buckets {
        kept.extend(dedup_bucket(bucket));
    }
    kept
}

fn dedup_bucket(bucket: Vec<Article>) -> Vec<Article> {
    let mut survivors: Vec<Article> = Vec::new();

    'candidates: for candidate in bucket {
        let candidate_title = normalize(&candidate.reference.title);
        for existing in survivors.iter_mut() {
            let existing_title = normalize(&existing.reference.title);
            if similarity_ratio(&candidate_title, &existing_title) >= SIMILARITY_THRESHOLD {
                if candidate.quality_score() > existing.quality_score() {
                    *existing = candidate;
                }
                continue 'candidates;
            }
        }
        survivors.push(candidate);
    }

    survivors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ist_now, ArticleRef};

    fn article(title: &str, language: &str, full_text: Option<&str>) -> Article {
        let reference = ArticleRef {
            title: title.to_string(),
            url: format!("https://example.com/{}", title),
            source_name: "rss-aggregator".into(),
            timestamp: ist_now(),
            language: language.to_string(),
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
    fn identical_titles_have_ratio_one() {
        assert_eq!(similarity_ratio("heatwave alert", "heatwave alert"), 1.0);
    }

    #[test]
    fn completely_different_titles_have_low_ratio() {
        assert!(similarity_ratio("heatwave alert in rajasthan", "cricket match result") < 0.5);
    }

    #[test]
    fn strips_short_publisher_suffix() {
        let stripped = strip_suffix("Heatwave grips Rajasthan - Times of India");
        assert_eq!(stripped, "Heatwave grips Rajasthan");
    }

    #[test]
    fn keeps_long_suffix_since_it_might_not_be_a_publisher_name() {
        let long_suffix = "a".repeat(45);
        let title = format!("Heatwave grips Rajasthan - {}", long_suffix);
        assert_eq!(strip_suffix(&title), title);
    }

    #[test]
    fn dedup_keeps_higher_quality_survivor() {
        let a = article("Heatwave grips Rajasthan today", "en", None);
        let b = article("Heatwave grips Rajasthan today", "en", Some("full article body text"));
        let result = dedup_titles(vec![a, b]);
        assert_eq!(result.len(), 1);
        assert!(result[0].full_text.is_some());
    }

    #[test]
    fn different_languages_are_not_deduped_against_each_other() {
        let a = article("Heatwave grips Rajasthan today", "en", None);
        let b = article("Heatwave grips Rajasthan today", "hi", None);
        let result = dedup_titles(vec![a, b]);
        assert_eq!(result.len(), 2);
    }
}
