//! The `RelevanceChecker` contract and the two pipeline-facing wrappers
//! built on top of it.

use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;

use crate::models::Article;

#[derive(Debug, Error)]
pub enum RelevanceCheckError {
    #[error("transport error calling relevance provider: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("could not decode relevance provider response: {0}")]
    Decode(String),
}

/// A single relevance/geo-tagging backend. Implementations must not panic;
/// every failure mode should surface as `Err` so callers can apply the
/// fail-open/fail-safe policy uniformly.
#[async_trait]
pub trait RelevanceChecker: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether this article is actually about heat / heat impacts.
    async fn check_relevance(&self, article: &Article) -> Result<bool, RelevanceCheckError>;

    /// Which of `candidates` (district names) this article primarily
    /// concerns, if any.
    async fn extract_district(
        &self,
        article: &Article,
        candidates: &[String],
    ) -> Result<Option<String>, RelevanceCheckError>;

    /// Release any held resources (connection pools, etc). Most providers
    /// need nothing here since `reqwest::Client` cleans up on drop.
    async fn close(&self) {}
}

pub fn relevance_prompt(article: &Article) -> String {
    format!(
        "You are assessing whether a news article is substantively about heat, heatwaves, or heat-related impacts (health, water, power, agriculture, labor) in India. Respond with exactly one word: \"yes\" or \"no\".\n\nTitle: {title}\nText: {text}\n",
        title = article.reference.title,
        text = article.full_text.as_deref().unwrap_or("(no body text available)"),
    )
}

pub fn district_prompt(article: &Article, candidates: &[String]) -> String {
    format!(
        "This article concerns the state of {state}. Given the list of districts below, respond with exactly one district name from the list that the article primarily concerns, or respond \"none\" if no single district applies.\n\nDistricts: {districts}\n\nTitle: {title}\nText: {text}\n",
        state = article.reference.state,
        districts = candidates.join(", "),
        title = article.reference.title,
        text = article.full_text.as_deref().unwrap_or("(no body text available)"),
    )
}

/// Match a free-form model response against the candidate list
/// case-insensitively, ignoring surrounding punctuation/whitespace.
pub fn match_candidate(response: &str, candidates: &[String]) -> Option<String> {
    let cleaned = response.trim().trim_matches(|c: char| c == '"' || c == '.');
    if cleaned.eq_ignore_ascii_case("none") {
        return None;
    }
    candidates
        .iter()
        .find(|c| c.eq_ignore_ascii_case(cleaned) || cleaned.to_lowercase().contains(&c.to_lowercase()))
        .cloned()
}

/// Run relevance filtering over a batch of articles, keeping an article
/// whenever the checker says yes *or* whenever the checker itself errors —
/// a misbehaving LLM provider should never cause real coverage to vanish.
pub async fn filter_refs(checker: &dyn RelevanceChecker, articles: Vec<Article>) -> Vec<Article> {
    let mut kept = Vec::with_capacity(articles.len());
    for article in articles {
        match checker.check_relevance(&article).await {
            Ok(true) => kept.push(article),
            Ok(false) => {}
            Err(e) => {
                warn!(provider = checker.name(), error = %e, "relevance check failed, keeping article (fail-open)");
                kept.push(article);
            }
        }
    }
    kept
}

/// Attempt to tag an article with a district. On any error, the article is
/// returned unchanged rather than dropped or left in a partial state.
pub async fn tag_district(
    checker: &dyn RelevanceChecker,
    article: Article,
    candidates: &[String],
) -> Article {
    match checker.extract_district(&article, candidates).await {
        Ok(Some(district)) => article.with_district(Some(district)),
        Ok(None) => article,
        Err(e) => {
            warn!(provider = checker.name(), error = %e, "district extraction failed, leaving article untagged (fail-safe)");
            article
        }
    }
}
