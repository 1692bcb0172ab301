//! Drives extraction for a batch of `ArticleRef`s: resolve each URL, fetch
//! the page, pull out the main text. Runs in bounded-concurrency chunks so
//! memory stays flat across a run with tens of thousands of articles, and
//! checks a deadline between chunks so a slow run degrades to
//! text-less `Article`s instead of blowing past its time budget.

use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt};
use tokio::time::sleep;
use tracing::{instrument, warn};

use crate::extraction::resolver::UrlResolver;
use crate::extraction::text_extractor::{HeuristicExtractor, TextExtractor};
use crate::models::{Article, ArticleRef};

const FETCH_ATTEMPTS: usize = 2;
const FETCH_RETRY_DELAY: Duration = Duration::from_secs(2);

/// `chunk_size = 3 * max_concurrent` keeps enough work in flight to fill
/// every concurrency slot while still yielding to the deadline check
/// reasonably often.
pub struct ArticleExtractor {
    resolver: UrlResolver,
    text_extractor: Box<dyn TextExtractor>,
    http_client: reqwest::Client,
    max_concurrent: usize,
}

impl ArticleExtractor {
    pub fn new(max_concurrent: usize) -> Self {
        ArticleExtractor {
            resolver: UrlResolver::new(),
            text_extractor: Box::new(HeuristicExtractor::new()),
            http_client: reqwest::Client::builder()
                .connect_timeout(std::time::Duration::from_secs(5))
                .timeout(std::time::Duration::from_secs(15))
                .build()
                .expect("reqwest client config is valid"),
            max_concurrent: max_concurrent.max(1),
        }
    }

    #[instrument(level = "info", skip(self, refs), fields(count = refs.len()))]
    pub async fn extract_articles(
        &self,
        refs: Vec<ArticleRef>,
        deadline: Option<Instant>,
    ) -> Vec<Article> {
        let chunk_size = self.max_concurrent * 3;
        let mut articles = Vec::with_capacity(refs.len());
        let mut idx = 0;

        while idx < refs.len() {
            if let Some(deadline) = deadline {
                if Instant::now() >= deadline {
                    warn!("extraction deadline reached, leaving remaining refs unextracted");
                    break;
                }
            }

            let end = (idx + chunk_size).min(refs.len());
            let chunk = &refs[idx..end];

            let mut indexed: Vec<(usize, Article)> = stream::iter(chunk.iter().cloned().enumerate())
                .map(|(i, reference)| async move { (i, self.extract_one(reference).await) })
                .buffer_unordered(self.max_concurrent)
                .collect()
                .await;
            indexed.sort_by_key(|(i, _)| *i);
            articles.extend(indexed.into_iter().map(|(_, article)| article));

            idx = end;
        }

        for reference in &refs[idx..] {
            articles.push(Article::without_text(reference.clone()));
        }

        articles
    }

    async fn extract_one(&self, reference: ArticleRef) -> Article {
        let resolved_url = self.resolver.resolve(&reference.url).await;
        let reference = if resolved_url != reference.url {
            reference.with_url(resolved_url)
        } else {
            reference
        };

        match self.fetch_html(&reference.url).await {
            Some(html) => match self.text_extractor.extract(&html) {
                Some(text) => Article::with_text(reference, text),
                None => Article::without_text(reference),
            },
            None => Article::without_text(reference),
        }
    }

    /// Fetch a page's HTML, retrying once after a fixed pause on a timeout
    /// or HTTP-level failure. Gives up (returning `None`) after the second
    /// attempt also fails.
    async fn fetch_html(&self, url: &str) -> Option<String> {
        for attempt in 0..FETCH_ATTEMPTS {
            let retries_remain = attempt + 1 < FETCH_ATTEMPTS;

            let response = match self.http_client.get(url).send().await {
                Ok(resp) => resp,
                Err(e) => {
                    warn!(error = %e, url, "failed fetching article");
                    if retries_remain {
                        sleep(FETCH_RETRY_DELAY).await;
                        continue;
                    }
                    return None;
                }
            };

            if !response.status().is_success() {
                warn!(status = %response.status(), url, "non-success status fetching article");
                if retries_remain {
                    sleep(FETCH_RETRY_DELAY).await;
                    continue;
                }
                return None;
            }

            return match response.text().await {
                Ok(body) => Some(body),
                Err(e) => {
                    warn!(error = %e, url, "failed reading article body");
                    None
                }
            };
        }
        None
    }
}
