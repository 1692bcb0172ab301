//! Two-phase collection orchestration: state-level queries across every
//! region, then district-level queries restricted to regions Phase 1 found
//! active. One worker task per source drains that source's queue in order,
//! pulling through its own scheduler's rate limiters; a `JoinSet`
//! supervises the three workers so a panic or error in one never aborts
//! `run_collection` for the others.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{info, instrument, warn};

use crate::models::{Query, QueryResult, Region};
use crate::query::generator;
use crate::query::scheduler::SourceScheduler;
use crate::reliability::checkpoint::CheckpointStore;

pub struct QueryExecutor {
    sources: Vec<Arc<SourceScheduler>>,
}

impl QueryExecutor {
    pub fn new(sources: Vec<Arc<SourceScheduler>>) -> Self {
        QueryExecutor { sources }
    }

    /// Run Phase 1 (state-level) across all regions, compute which regions
    /// are active (at least one article surfaced), then run Phase 2
    /// (district-level) for active regions only. Returns every
    /// `QueryResult` from both phases; never propagates an error.
    #[instrument(level = "info", skip_all, fields(regions = regions.len()))]
    pub async fn run_collection(
        &self,
        regions: &[Region],
        checkpoint: Arc<Mutex<CheckpointStore>>,
        deadline: Option<Instant>,
    ) -> Vec<QueryResult> {
        info!("starting phase 1 (state-level) collection");
        let phase1 = self
            .run_phase(regions, QueryLevelKind::State, checkpoint.clone(), deadline)
            .await;

        let active_slugs: HashSet<&str> = phase1
            .iter()
            .filter(|r| r.success && !r.articles.is_empty())
            .map(|r| r.query.region_slug.as_str())
            .collect();
        let active_regions: Vec<Region> = regions
            .iter()
            .filter(|r| active_slugs.contains(r.slug.as_str()))
            .cloned()
            .collect();
        info!(active = active_regions.len(), "phase 1 complete");

        if let Some(deadline) = deadline {
            if Instant::now() >= deadline {
                warn!("deadline reached before phase 2, skipping district-level collection");
                return phase1;
            }
        }

        info!("starting phase 2 (district-level) collection");
        let phase2 = self
            .run_phase(
                &active_regions,
                QueryLevelKind::District,
                checkpoint,
                deadline,
            )
            .await;

        phase1.into_iter().chain(phase2).collect()
    }

    async fn run_phase(
        &self,
        regions: &[Region],
        level: QueryLevelKind,
        checkpoint: Arc<Mutex<CheckpointStore>>,
        deadline: Option<Instant>,
    ) -> Vec<QueryResult> {
        let mut join_set: JoinSet<Vec<QueryResult>> = JoinSet::new();

        for scheduler in &self.sources {
            let scheduler = scheduler.clone();
            let queries = build_queries(regions, level, scheduler.source_name(), scheduler.supported_languages());
            let checkpoint = checkpoint.clone();

            join_set.spawn(async move {
                drain_queries(scheduler, queries, checkpoint, deadline).await
            });
        }

        let mut results = Vec::new();
        while let Some(outcome) = join_set.join_next().await {
            match outcome {
                Ok(mut batch) => results.append(&mut batch),
                Err(e) => warn!(error = %e, "source worker task failed"),
            }
        }
        results
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum QueryLevelKind {
    State,
    District,
}

fn build_queries(
    regions: &[Region],
    level: QueryLevelKind,
    source_name: &str,
    supported_languages: &'static [&'static str],
) -> Vec<Query> {
    use crate::models::SourceHint;
    let source_hint = match source_name {
        crate::sources::rss_aggregator::SOURCE_NAME => SourceHint::RssAggregator,
        crate::sources::json_api_a::SOURCE_NAME => SourceHint::JsonApiA,
        crate::sources::json_api_b::SOURCE_NAME => SourceHint::JsonApiB,
        _ => return Vec::new(),
    };

    let mut queries = Vec::new();
    for region in regions {
        let generated = match level {
            QueryLevelKind::State => {
                generator::generate_state_queries(region, source_hint, supported_languages)
            }
            QueryLevelKind::District => {
                generator::generate_district_queries(region, source_hint, supported_languages)
            }
        };
        queries.extend(generated);
    }
    queries
}

/// Sequentially run every query for one source, skipping anything the
/// checkpoint already marked complete, stopping early if the deadline has
/// passed. Marks and saves the checkpoint as results come in so progress
/// survives a crash mid-phase. Phase-2 results are stamped with their
/// batch's district(s) here, unconditionally (no LLM involved) — the
/// optional LLM district tagger only ever runs later, on refs still
/// missing one.
async fn drain_queries(
    scheduler: Arc<SourceScheduler>,
    queries: Vec<Query>,
    checkpoint: Arc<Mutex<CheckpointStore>>,
    deadline: Option<Instant>,
) -> Vec<QueryResult> {
    let mut results = Vec::new();

    for query in queries {
        if let Some(deadline) = deadline {
            if Instant::now() >= deadline {
                warn!(source = scheduler.source_name(), "deadline reached, stopping drain");
                break;
            }
        }

        let already_done = {
            let store = checkpoint.lock().await;
            store.is_completed(&query)
        };
        if already_done {
            continue;
        }

        let result = scheduler.execute(query.clone()).await;
        let result = tag_batch_districts(result);

        {
            let mut store = checkpoint.lock().await;
            store.mark_completed(&query);
            if let Err(e) = store.save().await {
                warn!(error = %e, "failed saving checkpoint");
            }
        }

        results.push(result);
    }

    results
}

/// Stamp a Phase-2 result's district batch onto its refs. State-level
/// results carry an empty `districts` list and pass through unchanged. A
/// single-district batch tags every ref with that district; a
/// multi-district batch tags each ref with the first district whose name
/// occurs as a case-insensitive substring of the title, leaving the ref
/// untagged if none match.
fn tag_batch_districts(mut result: QueryResult) -> QueryResult {
    let districts = result.query.districts.clone();
    if districts.is_empty() {
        return result;
    }

    result.articles = result
        .articles
        .into_iter()
        .map(|article_ref| match districts.as_slice() {
            [only] => article_ref.with_district(Some(only.clone())),
            many => {
                let title_lower = article_ref.title.to_lowercase();
                match many.iter().find(|d| title_lower.contains(&d.to_lowercase())) {
                    Some(district) => article_ref.with_district(Some(district.clone())),
                    None => article_ref,
                }
            }
        })
        .collect();

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ArticleRef, District, QueryLevel, RegionKind, SourceHint};
    use crate::reliability::retry::SourceError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubSource {
        name: &'static str,
        languages: &'static [&'static str],
        article_count: usize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl crate::sources::NewsSource for StubSource {
        fn name(&self) -> &'static str {
            self.name
        }

        fn supported_languages(&self) -> &'static [&'static str] {
            self.languages
        }

        async fn search(
            &self,
            _query_string: &str,
            language: &str,
            state: &str,
            search_term: &str,
        ) -> Result<Vec<ArticleRef>, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let articles = (0..self.article_count)
                .map(|i| ArticleRef {
                    title: format!("story {}", i),
                    url: format!("https://example.com/{}", i),
                    source_name: self.name.to_string(),
                    timestamp: crate::models::ist_now(),
                    language: language.to_string(),
                    state: state.to_string(),
                    district: None,
                    search_term: search_term.to_string(),
                })
                .collect();
            Ok(articles)
        }
    }

    fn region(slug: &str) -> Region {
        Region {
            name: slug.to_string(),
            slug: slug.to_string(),
            kind: RegionKind::State,
            languages: vec!["en".to_string()],
            districts: vec![District {
                name: "Sample District".into(),
                slug: "sample-district".into(),
            }],
        }
    }

    fn tempdir() -> std::path::PathBuf {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        let n = COUNTER.fetch_add(1, Ordering::SeqCst);
        let mut dir = std::env::temp_dir();
        dir.push(format!("heatwatch_executor_test_{}_{}", std::process::id(), n));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[tokio::test]
    async fn drain_queries_skips_already_completed() {
        let source = StubSource {
            name: crate::sources::rss_aggregator::SOURCE_NAME,
            languages: &["en"],
            article_count: 1,
            calls: AtomicUsize::new(0),
        };
        let scheduler = Arc::new(SourceScheduler::new(Box::new(source)));
        let region = region("rajasthan");
        let queries =
            generator::generate_state_queries(&region, SourceHint::RssAggregator, &["en"]);
        assert!(!queries.is_empty());

        let mut store = CheckpointStore::new(tempdir().join("checkpoint.json"));
        store.load().await.unwrap();
        for q in &queries {
            store.mark_completed(q);
        }
        let checkpoint = Arc::new(Mutex::new(store));

        let results = drain_queries(scheduler, queries, checkpoint, None).await;
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn phase1_marks_region_active_when_articles_found() {
        let rss = Arc::new(SourceScheduler::new(Box::new(StubSource {
            name: crate::sources::rss_aggregator::SOURCE_NAME,
            languages: &["en"],
            article_count: 1,
            calls: AtomicUsize::new(0),
        })));
        let executor = QueryExecutor::new(vec![rss]);
        let regions = vec![region("rajasthan")];
        let checkpoint = Arc::new(Mutex::new(CheckpointStore::new(
            tempdir().join("checkpoint.json"),
        )));

        let results = executor.run_collection(&regions, checkpoint, None).await;
        assert!(results.iter().any(|r| !r.articles.is_empty()));
    }

    fn sample_article_ref(title: &str) -> ArticleRef {
        ArticleRef {
            title: title.to_string(),
            url: "https://example.com/a".into(),
            source_name: "rss-aggregator".into(),
            timestamp: crate::models::ist_now(),
            language: "en".into(),
            state: "Rajasthan".into(),
            district: None,
            search_term: "heatwave".into(),
        }
    }

    fn district_query(districts: Vec<String>) -> Query {
        Query {
            query_string: "heatwave (\"Jaipur\" OR \"Jodhpur\")".into(),
            language: "en".into(),
            region_name: "Rajasthan".into(),
            region_slug: "rajasthan".into(),
            level: QueryLevel::District,
            category: Some("weather".into()),
            source_hint: SourceHint::RssAggregator,
            districts,
        }
    }

    #[test]
    fn single_district_batch_tags_every_ref() {
        let query = district_query(vec!["Jaipur".to_string()]);
        let result = QueryResult::ok(
            query,
            "rss-aggregator",
            vec![sample_article_ref("heatwave grips the state")],
        );
        let tagged = tag_batch_districts(result);
        assert_eq!(tagged.articles[0].district.as_deref(), Some("Jaipur"));
    }

    #[test]
    fn multi_district_batch_tags_by_title_substring() {
        let query = district_query(vec!["Jaipur".to_string(), "Jodhpur".to_string()]);
        let result = QueryResult::ok(
            query,
            "rss-aggregator",
            vec![sample_article_ref("Heatwave alert issued for Jodhpur")],
        );
        let tagged = tag_batch_districts(result);
        assert_eq!(tagged.articles[0].district.as_deref(), Some("Jodhpur"));
    }

    #[test]
    fn multi_district_batch_leaves_ref_untagged_when_no_name_matches() {
        let query = district_query(vec!["Jaipur".to_string(), "Jodhpur".to_string()]);
        let result = QueryResult::ok(
            query,
            "rss-aggregator",
            vec![sample_article_ref("severe heatwave across the region")],
        );
        let tagged = tag_batch_districts(result);
        assert_eq!(tagged.articles[0].district, None);
    }

    #[test]
    fn state_level_result_passes_through_unchanged() {
        let query = Query {
            query_string: "heatwave".into(),
            language: "en".into(),
            region_name: "Rajasthan".into(),
            region_slug: "rajasthan".into(),
            level: QueryLevel::State,
            category: Some("weather".into()),
            source_hint: SourceHint::RssAggregator,
            districts: vec![],
        };
        let result = QueryResult::ok(
            query,
            "rss-aggregator",
            vec![sample_article_ref("heatwave grips the state")],
        );
        let tagged = tag_batch_districts(result);
        assert_eq!(tagged.articles[0].district, None);
    }
}
