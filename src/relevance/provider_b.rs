//! A messages-style `/messages` backed [`RelevanceChecker`].

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::models::Article;
use crate::relevance::checker::{
    district_prompt, match_candidate, relevance_prompt, RelevanceCheckError, RelevanceChecker,
};

pub const DEFAULT_ENDPOINT: &str = "https://provider-b.example.org/v1/messages";
pub const DEFAULT_MODEL: &str = "provider-b-default";

fn is_affirmative(text: &str) -> bool {
    text.trim()
        .trim_matches(|c: char| c == '"' || c == '.')
        .eq_ignore_ascii_case("yes")
}

pub struct ProviderB {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl ProviderB {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        ProviderB {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    async fn complete(&self, prompt: String) -> Result<String, RelevanceCheckError> {
        #[derive(Deserialize)]
        struct Response {
            content: Vec<Block>,
        }
        #[derive(Deserialize)]
        struct Block {
            text: String,
        }

        let body = json!({
            "model": self.model,
            "max_tokens": 32,
            "messages": [{"role": "user", "content": prompt}],
        });
        let response = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("x-provider-version", "2023-06-01")
            .json(&body)
            .send()
            .await?
            .error_for_status()?;
        let parsed: Response = response.json().await?;
        parsed
            .content
            .into_iter()
            .next()
            .map(|b| b.text)
            .ok_or_else(|| RelevanceCheckError::Decode("no content blocks in response".into()))
    }
}

#[async_trait]
impl RelevanceChecker for ProviderB {
    fn name(&self) -> &'static str {
        "provider-b"
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
