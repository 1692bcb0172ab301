//! A chat-completions-style `/chat/completions` backed [`RelevanceChecker`].

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::models::Article;
use crate::relevance::checker::{
    district_prompt, match_candidate, relevance_prompt, RelevanceCheckError, RelevanceChecker,
};

pub const DEFAULT_ENDPOINT: &str = "https://provider-a.example.org/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "provider-a-default";

fn is_affirmative(text: &str) -> bool {
    text.trim()
        .trim_matches(|c: char| c == '"' || c == '.')
        .eq_ignore_ascii_case("yes")
}

pub struct ProviderA {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl ProviderA {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        ProviderA {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    async fn complete(&self, prompt: String) -> Result<String, RelevanceCheckError> {
        #[derive(Deserialize)]
        struct Response {
            choices: Vec<Choice>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: Message,
        }
        #[derive(Deserialize)]
        struct Message {
            content: String,
        }

        let body = json!({
            "model": self.model,
            "messages": [{"role": "user", "content": prompt}],
            "temperature": 0.0,
        });
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;
        let parsed: Response = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| RelevanceCheckError::Decode("no choices in response".into()))
    }
}

#[async_trait]
impl RelevanceChecker for ProviderA {
    fn name(&self) -> &'static str {
        "provider-a"
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
