//! # Heatwatch India
//!
//! A collection pipeline that discovers, extracts, deduplicates, and
//! geo-tags heat-related news coverage across India's states, union
//! territories, and districts.
//!
//! ## Architecture
//!
//! The pipeline runs in stages:
//! 1. **Collection** (`query`): two-phase state-then-district search across
//!    every enabled backend, checkpointed so a crash mid-run resumes.
//! 2. **Pre-filtering** (`dedup::title_relevance`): a cheap title heat-signal
//!    check, and an optional LLM relevance pass (`relevance`), both run
//!    before spending a fetch on anything.
//! 3. **Extraction** (`extraction`): resolves redirect URLs and pulls main
//!    body text out of each surviving article.
//! 4. **Dedup + scoring** (`dedup`): URL canonicalization, title-similarity
//!    clustering, then heat-term relevance scoring with exclusion.
//! 5. **Output** (`outputs`): per-state/date/district JSON + CSV, plus a
//!    run-level metadata file.

use std::collections::{BTreeMap, BTreeSet};
use std::error::Error;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{fmt as tfmt, EnvFilter};

mod cli;
mod config;
mod data;
mod dedup;
mod extraction;
mod models;
mod outputs;
mod query;
mod relevance;
mod reliability;
mod sources;
mod utils;

use cli::Cli;
use config::{Config, Lookback, LlmSelection};
use dedup::{relevance as relevance_dedup, title_dedup, title_relevance, url_dedup};
use extraction::extractor::ArticleExtractor;
use models::{Article, ArticleRef, Region};
use outputs::{metadata::CollectionMetadata, writer};
use query::executor::QueryExecutor;
use query::scheduler::SourceScheduler;
use relevance::checker::{filter_refs, tag_district, RelevanceChecker};
use relevance::consensus::ConsensusChecker;
use relevance::provider_a::{self, ProviderA};
use relevance::provider_b::{self, ProviderB};
use relevance::provider_c::{self, ProviderC};
use reliability::checkpoint::CheckpointStore;
use reliability::circuit_breaker::CircuitBreaker;
use reliability::rate_limiter::{PerSecondLimiter, WindowLimiter};
use sources::{json_api_a, json_api_b, rss_aggregator};
use utils::ensure_writable_dir;

const EXTRACTION_CONCURRENCY: usize = 8;
const PIPELINE_SAFETY_BUFFER: Duration = Duration::from_secs(120);
const COLLECTION_SHARE: f64 = 0.8;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = Instant::now();
    info!("heatwatch_india starting up");

    let cli = Cli::parse();
    let config = Config::resolve(cli)?;
    debug!(output_dir = %config.output_dir, "resolved configuration");

    data::validate_all();
    ensure_writable_dir(&config.output_dir).await?;

    let regions = select_regions(&config);
    if regions.is_empty() {
        error!("no regions selected after applying --regions/--districts filters");
        return Err("no regions selected".into());
    }
    info!(regions = regions.len(), "selected regions for collection");

    let mut checkpoint_store = CheckpointStore::new(config.checkpoint_path.clone());
    checkpoint_store.load().await?;
    let checkpoint = Arc::new(Mutex::new(checkpoint_store));

    let schedulers = build_sources(&config);
    if schedulers.is_empty() {
        error!("no sources enabled; nothing to collect");
        return Err("no sources enabled".into());
    }
    let source_names: Vec<String> = schedulers.iter().map(|s| s.source_name().to_string()).collect();

    let (collection_deadline, extraction_deadline) = pipeline_deadlines(config.pipeline_timeout);

    let executor = QueryExecutor::new(schedulers);
    let results = executor
        .run_collection(&regions, checkpoint.clone(), collection_deadline)
        .await;

    let discovered: usize = results.iter().map(|r| r.articles.len()).sum();
    let refs: Vec<ArticleRef> = results.into_iter().flat_map(|r| r.articles).collect();
    info!(discovered, "collection finished");

    let refs = title_relevance::filter_by_title_signal(refs);
    info!(after_title_filter = refs.len(), "applied title heat-signal pre-filter");

    let refs = apply_lookback(refs, &config.lookback);
    info!(after_lookback = refs.len(), "applied lookback window filter");

    let llm_checker = build_checker(&config);

    let refs = if let Some(checker) = &llm_checker {
        let as_articles: Vec<Article> = refs.into_iter().map(Article::without_text).collect();
        let kept = filter_refs(checker.as_ref(), as_articles).await;
        kept.into_iter().map(|a| a.reference).collect()
    } else {
        refs
    };
    info!(after_llm_filter = refs.len(), "applied optional LLM relevance filter");

    let mut refs = refs;
    if refs.len() > config.extraction_cap {
        warn!(
            cap = config.extraction_cap,
            dropped = refs.len() - config.extraction_cap,
            "extraction cap reached, truncating"
        );
        refs.truncate(config.extraction_cap);
    }

    let extractor = ArticleExtractor::new(EXTRACTION_CONCURRENCY);
    let articles = extractor.extract_articles(refs, extraction_deadline).await;
    info!(extracted = articles.len(), "extraction complete");

    let articles = url_dedup::dedup_by_url(articles);
    let articles = title_dedup::dedup_titles(articles);
    let articles = relevance_dedup::score_and_filter(articles);
    info!(after_dedup = articles.len(), "dedup and relevance scoring complete");

    let articles = tag_districts(&llm_checker, articles).await;

    if let Some(checker) = &llm_checker {
        checker.close().await;
    }

    let counts = BTreeMap::from([
        ("discovered".to_string(), discovered),
        ("written".to_string(), articles.len()),
    ]);
    let query_terms_used: Vec<String> = articles
        .iter()
        .map(|a| a.reference.search_term.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let metadata = CollectionMetadata::new(source_names, query_terms_used, counts);

    outputs::metadata::write_metadata(&metadata, &config.output_dir).await?;
    writer::write_articles(articles, &config.output_dir).await?;

    checkpoint.lock().await.clear().await?;

    let elapsed = start_time.elapsed();
    info!(?elapsed, secs = elapsed.as_secs(), "heatwatch_india run complete");

    Ok(())
}

/// Restrict the reference region list to `--regions`/`--districts`, if
/// given. A region whose districts are all filtered out by `--districts`
/// is dropped entirely rather than kept with an empty district list.
fn select_regions(config: &Config) -> Vec<Region> {
    let mut regions: Vec<Region> = match &config.regions {
        Some(slugs) => data::geo::all_regions()
            .iter()
            .filter(|r| slugs.iter().any(|s| s == &r.slug))
            .cloned()
            .collect(),
        None => data::geo::all_regions().to_vec(),
    };

    if let Some(district_slugs) = &config.districts {
        for region in &mut regions {
            region.districts.retain(|d| district_slugs.iter().any(|s| s == &d.slug));
        }
        regions.retain(|r| !r.districts.is_empty());
    }

    regions
}

fn source_enabled(config: &Config, name: &str) -> bool {
    match &config.sources {
        Some(list) => list.iter().any(|s| s == name),
        None => true,
    }
}

/// Build one [`SourceScheduler`] per enabled, keyed backend. The RSS
/// aggregator needs no key; json-api-A/B are skipped with a warning if
/// selected but missing their key.
fn build_sources(config: &Config) -> Vec<Arc<SourceScheduler>> {
    let mut schedulers: Vec<Arc<SourceScheduler>> = Vec::new();

    if source_enabled(config, rss_aggregator::SOURCE_NAME) {
        let scheduler = SourceScheduler::new(Box::new(rss_aggregator::RssAggregatorSource::new()))
            .with_breaker(CircuitBreaker::default_params())
            .with_concurrency(3)
            .with_per_second_limiter(PerSecondLimiter::new(1.0, 0.25));
        schedulers.push(Arc::new(scheduler));
    }

    if source_enabled(config, json_api_a::SOURCE_NAME) {
        match &config.json_api_a_key {
            Some(key) => {
                let scheduler = SourceScheduler::new(Box::new(json_api_a::JsonApiASource::new(key.clone())))
                    .with_breaker(CircuitBreaker::default_params())
                    .with_daily_limit(200)
                    .with_concurrency(2)
                    .with_per_second_limiter(PerSecondLimiter::new(1.0, 0.25))
                    .with_window_limiter(WindowLimiter::new(200, 86_400));
                schedulers.push(Arc::new(scheduler));
            }
            None => warn!("json-api-A enabled but JSON_API_A_KEY not set, skipping"),
        }
    }

    if source_enabled(config, json_api_b::SOURCE_NAME) {
        match &config.json_api_b_key {
            Some(key) => {
                let scheduler = SourceScheduler::new(Box::new(json_api_b::JsonApiBSource::new(key.clone())))
                    .with_breaker(CircuitBreaker::default_params())
                    .with_daily_limit(100)
                    .with_concurrency(2)
                    .with_per_second_limiter(PerSecondLimiter::new(0.5, 0.25))
                    .with_window_limiter(WindowLimiter::new(100, 86_400));
                schedulers.push(Arc::new(scheduler));
            }
            None => warn!("json-api-B enabled but JSON_API_B_KEY not set, skipping"),
        }
    }

    schedulers
}

/// Split the overall pipeline timeout 80/20 between collection and
/// extraction, reserving a fixed safety buffer at the end for output
/// writing and checkpoint cleanup. `None` means no deadline at all.
fn pipeline_deadlines(pipeline_timeout: Option<Duration>) -> (Option<Instant>, Option<Instant>) {
    let now = Instant::now();
    match pipeline_timeout {
        Some(total) => {
            let available = total.saturating_sub(PIPELINE_SAFETY_BUFFER);
            let collection_share = available.mul_f64(COLLECTION_SHARE);
            let extraction_share = available.saturating_sub(collection_share);
            (
                Some(now + collection_share),
                Some(now + collection_share + extraction_share),
            )
        }
        None => (None, None),
    }
}

fn within_lookback(timestamp: &chrono::DateTime<chrono_tz::Tz>, lookback: &Lookback) -> bool {
    match lookback {
        Lookback::Hours(hours) => {
            let cutoff = models::ist_now() - chrono::Duration::hours(*hours as i64);
            *timestamp >= cutoff
        }
        Lookback::DateRange(start, end) => {
            let date = timestamp.date_naive();
            date >= *start && date <= *end
        }
    }
}

fn apply_lookback(refs: Vec<ArticleRef>, lookback: &Lookback) -> Vec<ArticleRef> {
    refs.into_iter()
        .filter(|r| within_lookback(&r.timestamp, lookback))
        .collect()
}

/// Construct the optional LLM relevance/district checker from `--llm-providers`.
/// A selected provider missing its API key is dropped with a warning rather
/// than failing the whole pipeline; if every selected provider ends up
/// dropped, the LLM layer is disabled entirely.
fn build_checker(config: &Config) -> Option<Box<dyn RelevanceChecker>> {
    let LlmSelection::Providers(letters) = &config.llm else {
        return None;
    };

    let mut checkers: Vec<Box<dyn RelevanceChecker>> = Vec::new();
    for letter in letters {
        match letter {
            'a' => match &config.provider_a_key {
                Some(key) => checkers.push(Box::new(ProviderA::new(
                    provider_a::DEFAULT_ENDPOINT,
                    key.clone(),
                    provider_a::DEFAULT_MODEL,
                ))),
                None => warn!("provider a selected but PROVIDER_A_API_KEY not set, skipping"),
            },
            'b' => match &config.provider_b_key {
                Some(key) => checkers.push(Box::new(ProviderB::new(
                    provider_b::DEFAULT_ENDPOINT,
                    key.clone(),
                    provider_b::DEFAULT_MODEL,
                ))),
                None => warn!("provider b selected but PROVIDER_B_API_KEY not set, skipping"),
            },
            'c' => match &config.provider_c_key {
                Some(key) => checkers.push(Box::new(ProviderC::new(provider_c::DEFAULT_ENDPOINT, key.clone()))),
                None => warn!("provider c selected but PROVIDER_C_API_KEY not set, skipping"),
            },
            other => warn!(letter = %other, "unreachable: config already validated provider letters"),
        }
    }

    match checkers.len() {
        0 => None,
        1 => checkers.into_iter().next(),
        _ => Some(Box::new(ConsensusChecker::new(checkers))),
    }
}

/// Tag articles still missing a district using the LLM checker, if
/// configured. The mandatory Phase-2 batch tagging in `query::executor`
/// already sets most districts before extraction; this only runs on
/// whatever's left unset. Candidates are the districts of the region named
/// on the article's `state` field; an article whose state doesn't resolve
/// to a known region is left untagged.
async fn tag_districts(
    llm_checker: &Option<Box<dyn RelevanceChecker>>,
    articles: Vec<Article>,
) -> Vec<Article> {
    let Some(checker) = llm_checker else {
        return articles;
    };

    let mut tagged = Vec::with_capacity(articles.len());
    for article in articles {
        if article.reference.district.is_some() {
            tagged.push(article);
            continue;
        }
        let candidates: Vec<String> = data::geo::region_by_name(&article.reference.state)
            .map(|r| r.districts.iter().map(|d| d.name.clone()).collect())
            .unwrap_or_default();
        if candidates.is_empty() {
            tagged.push(article);
            continue;
        }
        tagged.push(tag_district(checker.as_ref(), article, &candidates).await);
    }
    tagged
}
