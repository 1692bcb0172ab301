//! A generateContent-style backed [`RelevanceChecker`].

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::models::Article;
use crate::relevance::checker::{
    district_prompt, match_candidate, relevance_prompt, RelevanceCheckError, RelevanceChecker,
};

pub const DEFAULT_ENDPOINT: &str = "https://provider-c.example.org/v1/generateContent";

fn is_affirmative(text: &str) -> bool {
    text.trim()
        .trim_matches(|c: char| c == '"' || c == '.')
        .eq_ignore_ascii_case("yes")
}

pub struct ProviderC {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl ProviderC {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        ProviderC {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        }
    }

    async fn complete(&self, prompt: String) -> Result<String, RelevanceCheckError> {
        #[derive(Deserialize)]
        struct Response {
            candidates: Vec<Candidate>,
        }
        #[derive(Deserialize)]
        struct Candidate {
            content: Content,
        }
        #[derive(Deserialize)]
        struct Content {
            parts: Vec<Part>,
        }
        #[derive(Deserialize)]
        struct Part {
            text: String,
        }

        let body = json!({
            "contents": [{"parts": [{"text": prompt}]}],
        });
        let url = format!("{}?key={}", self.endpoint, self.api_key);
        let response = self.client.post(&url).json(&body).send().await?.error_for_status()?;
        let parsed: Response = response.json().await?;
        parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .ok_or_else(|| RelevanceCheckError::Decode("no candidates in response".into()))
    }
}

#[async_trait]
impl RelevanceChecker for ProviderC {
    fn name(&self) -> &'static str {
        "provider-c"
    }

    async fn check_relevance(&self, article: &Article) -> Result<bool, RelevanceCheckError> {
        let text = self.complete(relevance_prompt(article)).await?;
        Ok(is_affirmative(&text))
    }

    async fn extract_district(
        &self,
        article: &Article,
        candidates: &[String],
    ) -> Result<Option<String>, RelevanceCheckError> {
        let text = self.complete(district_prompt(article, candidates)).await?;
        Ok(match_candidate(&text, candidates))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn affirmative_matching_is_case_and_punctuation_insensitive() {
        assert!(is_affirmative("Yes."));
        assert!(!is_affirmative("nope"));
    }
}
