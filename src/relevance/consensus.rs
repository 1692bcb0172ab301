//! Majority-vote composition over any number of [`RelevanceChecker`]
//! sub-checkers. Used when more than one LLM provider is configured so a
//! single provider's idiosyncrasies don't drive district tagging or
//! relevance decisions on their own.

use std::collections::HashMap;

use async_trait::async_trait;
use tracing::warn;

use crate::models::Article;
use crate::relevance::checker::{RelevanceCheckError, RelevanceChecker};

pub struct ConsensusChecker {
    checkers: Vec<Box<dyn RelevanceChecker>>,
}

impl ConsensusChecker {
    pub fn new(checkers: Vec<Box<dyn RelevanceChecker>>) -> Self {
        ConsensusChecker { checkers }
    }
}

#[async_trait]
impl RelevanceChecker for ConsensusChecker {
    fn name(&self) -> &'static str {
        "consensus"
    }

    /// Majority vote among sub-checkers that answered successfully. A
    /// sub-checker that errors contributes no vote rather than a `false`.
    /// If every sub-checker errors, the overall call errors too so the
    /// caller's fail-open policy still applies.
    async fn check_relevance(&self, article: &Article) -> Result<bool, RelevanceCheckError> {
        let mut yes = 0usize;
        let mut no = 0usize;
        let mut last_err = None;

        for checker in &self.checkers {
            match checker.check_relevance(article).await {
                Ok(true) => yes += 1,
                Ok(false) => no += 1,
                Err(e) => {
                    warn!(provider = checker.name(), error = %e, "sub-checker failed during relevance vote");
                    last_err = Some(e);
                }
            }
        }

        if yes + no == 0 {
            return Err(last_err.unwrap_or(RelevanceCheckError::Decode(
                "no sub-checker produced a relevance vote".into(),
            )));
        }
        Ok(yes >= no)
    }

    /// Majority vote over the district each sub-checker named, skipping
    /// errors. Ties are broken by whichever district was first seen.
    async fn extract_district(
        &self,
        article: &Article,
        candidates: &[String],
    ) -> Result<Option<String>, RelevanceCheckError> {
        let mut votes: HashMap<String, usize> = HashMap::new();
        let mut order: Vec<String> = Vec::new();
        let mut none_votes = 0usize;
        let mut last_err = None;
        let mut any_ok = false;

        for checker in &self.checkers {
            match checker.extract_district(article, candidates).await {
                Ok(Some(district)) => {
                    any_ok = true;
                    if !votes.contains_key(&district) {
                        order.push(district.clone());
                    }
                    *votes.entry(district).or_insert(0) += 1;
                }
                Ok(None) => {
                    any_ok = true;
                    none_votes += 1;
                }
                Err(e) => {
                    warn!(provider = checker.name(), error = %e, "sub-checker failed during district vote");
                    last_err = Some(e);
                }
            }
        }

        if !any_ok {
            return Err(last_err.unwrap_or(RelevanceCheckError::Decode(
                "no sub-checker produced a district vote".into(),
            )));
        }

        let best = order
            .into_iter()
            .max_by_key(|d| votes.get(d).copied().unwrap_or(0));

        match best {
            Some(district) if votes[&district] > none_votes => Ok(Some(district)),
            _ => Ok(None),
        }
    }

    async fn close(&self) {
        for checker in &self.checkers {
            checker.close().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ist_now, ArticleRef};

    struct FixedChecker {
        relevance: Result<bool, &'static str>,
        district: Result<Option<&'static str>, &'static str>,
    }

    #[async_trait]
    impl RelevanceChecker for FixedChecker {
        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn check_relevance(&self, _article: &Article) -> Result<bool, RelevanceCheckError> {
            self.relevance
                .map_err(|e| RelevanceCheckError::Decode(e.to_string()))
        }

        async fn extract_district(
            &self,
            _article: &Article,
            _candidates: &[String],
        ) -> Result<Option<String>, RelevanceCheckError> {
            self.district
                .map(|d| d.map(|s| s.to_string()))
                .map_err(|e| RelevanceCheckError::Decode(e.to_string()))
        }
    }

    fn article() -> Article {
        Article::without_text(ArticleRef {
            title: "severe heatwave alert".into(),
            url: "https://example.com/a".into(),
            source_name: "rss-aggregator".into(),
            timestamp: ist_now(),
            language: "en".into(),
            state: "Rajasthan".into(),
            district: None,
            search_term: "heatwave".into(),
        })
    }

    #[tokio::test]
    async fn majority_yes_wins_relevance_vote() {
        let checkers: Vec<Box<dyn RelevanceChecker>> = vec![
            Box::new(FixedChecker { relevance: Ok(true), district: Ok(None) }),
            Box::new(FixedChecker { relevance: Ok(true), district: Ok(None) }),
            Box::new(FixedChecker { relevance: Ok(false), district: Ok(None) }),
        ];
        let consensus = ConsensusChecker::new(checkers);
        assert_eq!(consensus.check_relevance(&article()).await.unwrap(), true);
    }

    #[tokio::test]
    async fn errored_sub_checkers_do_not_count_as_no_votes() {
        let checkers: Vec<Box<dyn RelevanceChecker>> = vec![
            Box::new(FixedChecker { relevance: Ok(true), district: Ok(None) }),
            Box::new(FixedChecker { relevance: Err("boom"), district: Ok(None) }),
        ];
        let consensus = ConsensusChecker::new(checkers);
        assert_eq!(consensus.check_relevance(&article()).await.unwrap(), true);
    }

    #[tokio::test]
    async fn all_sub_checkers_erroring_propagates_error() {
        let checkers: Vec<Box<dyn RelevanceChecker>> = vec![
            Box::new(FixedChecker { relevance: Err("boom"), district: Ok(None) }),
            Box::new(FixedChecker { relevance: Err("bust"), district: Ok(None) }),
        ];
        let consensus = ConsensusChecker::new(checkers);
        assert!(consensus.check_relevance(&article()).await.is_err());
    }

    #[tokio::test]
    async fn district_majority_wins_over_none() {
        let checkers: Vec<Box<dyn RelevanceChecker>> = vec![
            Box::new(FixedChecker { relevance: Ok(true), district: Ok(Some("Jaipur")) }),
            Box::new(FixedChecker { relevance: Ok(true), district: Ok(Some("Jaipur")) }),
            Box::new(FixedChecker { relevance: Ok(true), district: Ok(None) }),
        ];
        let consensus = ConsensusChecker::new(checkers);
        let candidates = vec!["Jaipur".to_string(), "Jodhpur".to_string()];
        assert_eq!(
            consensus.extract_district(&article(), &candidates).await.unwrap(),
            Some("Jaipur".to_string())
        );
    }

    #[tokio::test]
    async fn district_none_wins_when_it_has_the_plurality() {
        let checkers: Vec<Box<dyn RelevanceChecker>> = vec![
            Box::new(FixedChecker { relevance: Ok(true), district: Ok(Some("Jaipur")) }),
            Box::new(FixedChecker { relevance: Ok(true), district: Ok(None) }),
            Box::new(FixedChecker { relevance: Ok(true), district: Ok(None) }),
        ];
        let consensus = ConsensusChecker::new(checkers);
        let candidates = vec!["Jaipur".to_string()];
        assert_eq!(
            consensus.extract_district(&article(), &candidates).await.unwrap(),
            None
        );
    }
}
