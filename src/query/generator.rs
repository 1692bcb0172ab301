//! Turns the heat-term dictionary into backend-shaped query strings.
//!
//! Each backend has a hard character limit on `q`: 2000 for the RSS
//! aggregator, 512 for json-api-A, 200 for json-api-B. Terms are packed
//! greedily, OR-joined, quoting any multi-word term so the backend treats it
//! as a phrase. The 4 characters of `" OR "` between items are counted
//! against the limit, not just the terms themselves.

use crate::data::heat_terms;
use crate::models::{Query, QueryLevel, Region, SourceHint, CATEGORIES, QUERY_CATEGORIES};

const OR_SEPARATOR: &str = " OR ";

fn quote_if_multiword(term: &str) -> String {
    if term.contains(' ') {
        format!("\"{}\"", term)
    } else {
        term.to_string()
    }
}

/// Greedily pack already-quoted items into `" OR "`-joined chunks, each no
/// longer than `max_len`. A single item longer than `max_len` still becomes
/// its own (oversized) chunk rather than being dropped.
fn pack_or_list(items: Vec<String>, max_len: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current: Vec<String> = Vec::new();
    let mut current_len = 0usize;

    for item in items {
        let additional = if current.is_empty() {
            item.len()
        } else {
            item.len() + OR_SEPARATOR.len()
        };
        if !current.is_empty() && current_len + additional > max_len {
            chunks.push(current.join(OR_SEPARATOR));
            current = Vec::new();
            current_len = 0;
        }
        current_len += if current.is_empty() {
            item.len()
        } else {
            item.len() + OR_SEPARATOR.len()
        };
        current.push(item);
    }
    if !current.is_empty() {
        chunks.push(current.join(OR_SEPARATOR));
    }
    chunks
}

/// Pack district names under a fixed `heat_term (...)` prefix, reserving
/// space for `" ("` and `")"` against the source's length limit.
fn pack_districts(prefix: &str, districts: &[String], max_len: usize) -> Vec<String> {
    let wrapper_overhead = prefix.len() + " (".len() + ")".len();
    let available = max_len.saturating_sub(wrapper_overhead);
    let quoted: Vec<String> = districts.iter().map(|d| quote_if_multiword(d)).collect();
    pack_or_list(quoted, available.max(1))
        .into_iter()
        .map(|inner| format!("{} ({})", prefix, inner))
        .collect()
}

fn max_query_length(source_hint: SourceHint) -> usize {
    match source_hint {
        SourceHint::RssAggregator => crate::sources::rss_aggregator::MAX_QUERY_LENGTH,
        SourceHint::JsonApiA => crate::sources::json_api_a::MAX_QUERY_LENGTH,
        SourceHint::JsonApiB => crate::sources::json_api_b::MAX_QUERY_LENGTH,
    }
}

/// Terms from the query categories only (weather/health/temperature) in
/// priority order. The remaining categories are available to scoring and
/// the title pre-filter but not to query generation.
fn priority_ordered_terms(language: &str) -> Vec<String> {
    QUERY_CATEGORIES
        .iter()
        .flat_map(|category| heat_terms::terms(language, category).iter().cloned())
        .collect()
}

/// A representative heat term for district batching: the first weather
/// term, falling back to the first term in any category that has one.
fn representative_term(language: &str) -> Option<String> {
    if let Some(term) = heat_terms::terms(language, "weather").first() {
        return Some(term.clone());
    }
    for category in CATEGORIES {
        if let Some(term) = heat_terms::terms(language, category).first() {
            return Some(term.clone());
        }
    }
    None
}

/// Generate state-level (Phase 1) queries for one region against one
/// backend. Skips any query language the backend doesn't support.
pub fn generate_state_queries(
    region: &Region,
    source_hint: SourceHint,
    supported_languages: &[&str],
) -> Vec<Query> {
    let max_len = max_query_length(source_hint);
    let mut queries = Vec::new();

    for language in region.query_languages() {
        if !supported_languages.contains(&language) {
            continue;
        }

        match source_hint {
            SourceHint::RssAggregator => {
                for category in QUERY_CATEGORIES {
                    let terms = heat_terms::terms(language, category);
                    if terms.is_empty() {
                        continue;
                    }
                    let quoted: Vec<String> = terms.iter().map(|t| quote_if_multiword(t)).collect();
                    for query_string in pack_or_list(quoted, max_len) {
                        queries.push(Query {
                            query_string,
                            language: language.to_string(),
                            region_name: region.name.clone(),
                            region_slug: region.slug.clone(),
                            level: QueryLevel::State,
                            category: Some(category.to_string()),
                            source_hint,
                            districts: vec![],
                        });
                    }
                }
            }
            SourceHint::JsonApiA | SourceHint::JsonApiB => {
                let ordered = priority_ordered_terms(language);
                if ordered.is_empty() {
                    continue;
                }
                let quoted: Vec<String> = ordered.iter().map(|t| quote_if_multiword(t)).collect();
                // One broad OR-joined query per region x language: pack
                // greedily and keep only the first chunk, dropping whatever
                // doesn't fit the budget rather than issuing more queries.
                if let Some(query_string) = pack_or_list(quoted, max_len).into_iter().next() {
                    queries.push(Query {
                        query_string,
                        language: language.to_string(),
                        region_name: region.name.clone(),
                        region_slug: region.slug.clone(),
                        level: QueryLevel::State,
                        category: None,
                        source_hint,
                        districts: vec![],
                    });
                }
            }
        }
    }

    queries
}

/// Generate district-level (Phase 2) queries for one region against one
/// backend. Callers are expected to only call this for regions already
/// found active in Phase 1.
pub fn generate_district_queries(
    region: &Region,
    source_hint: SourceHint,
    supported_languages: &[&str],
) -> Vec<Query> {
    let max_len = max_query_length(source_hint);
    let mut queries = Vec::new();

    for language in region.query_languages() {
        if !supported_languages.contains(&language) {
            continue;
        }
        let Some(term) = representative_term(language) else {
            continue;
        };
        let term = quote_if_multiword(&term);
        let district_names: Vec<String> = region.districts.iter().map(|d| d.name.clone()).collect();

        for query_string in pack_districts(&term, &district_names, max_len) {
            // Which districts ended up in this particular batch: re-derive
            // by checking which names (quoted or not) appear in the string.
            let districts_in_batch: Vec<String> = district_names
                .iter()
                .filter(|name| query_string.contains(name.as_str()))
                .cloned()
                .collect();
            queries.push(Query {
                query_string,
                language: language.to_string(),
                region_name: region.name.clone(),
                region_slug: region.slug.clone(),
                level: QueryLevel::District,
                category: Some("weather".to_string()),
                source_hint,
                districts: districts_in_batch,
            });
        }
    }

    queries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{District, RegionKind};

    fn sample_region() -> Region {
        Region {
            name: "Rajasthan".into(),
            slug: "rajasthan".into(),
            kind: RegionKind::State,
            languages: vec!["hi".into(), "en".into()],
            districts: vec![
                District {
                    name: "Jaipur".into(),
                    slug: "jaipur".into(),
                },
                District {
                    name: "Jodhpur".into(),
                    slug: "jodhpur".into(),
                },
            ],
        }
    }

    #[test]
    fn pack_or_list_respects_max_len() {
        let items = vec!["alpha".to_string(), "beta".to_string(), "gamma".to_string()];
        let chunks = pack_or_list(items, 12);
        for chunk in &chunks {
            assert!(chunk.len() <= 12, "{:?} exceeds 12 chars", chunk);
        }
        assert!(chunks.iter().any(|c| c.contains("alpha")));
    }

    #[test]
    fn pack_or_list_keeps_oversized_single_item() {
        let items = vec!["a".repeat(500)];
        let chunks = pack_or_list(items.clone(), 10);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0], items[0]);
    }

    #[test]
    fn state_queries_restrict_rss_to_query_categories() {
        let region = sample_region();
        let queries = generate_state_queries(&region, SourceHint::RssAggregator, &["hi", "en"]);
        for q in &queries {
            assert!(QUERY_CATEGORIES.contains(&q.category.as_deref().unwrap()));
            assert!(q.query_string.len() <= 2000);
        }
        assert!(!queries.is_empty());
    }

    #[test]
    fn state_queries_skip_unsupported_language() {
        let region = sample_region();
        let queries = generate_state_queries(&region, SourceHint::JsonApiB, &["en"]);
        assert!(queries.iter().all(|q| q.language == "en"));
    }

    #[test]
    fn json_api_queries_respect_their_own_length_limit() {
        let region = sample_region();
        let queries = generate_state_queries(&region, SourceHint::JsonApiB, &["hi", "en"]);
        for q in &queries {
            assert!(q.query_string.len() <= 200);
            assert!(q.category.is_none());
        }
    }

    #[test]
    fn json_api_emits_exactly_one_broad_query_per_language() {
        let region = sample_region();
        let queries = generate_state_queries(&region, SourceHint::JsonApiB, &["hi", "en"]);
        let en_queries: Vec<&Query> = queries.iter().filter(|q| q.language == "en").collect();
        assert_eq!(en_queries.len(), 1);
    }

    #[test]
    fn json_api_broad_query_only_draws_from_query_categories() {
        let region = sample_region();
        let queries = generate_state_queries(&region, SourceHint::JsonApiA, &["en"]);
        let governance_term = heat_terms::terms("en", "governance")
            .first()
            .cloned()
            .unwrap_or_default();
        assert!(!governance_term.is_empty());
        for q in &queries {
            assert!(!q.query_string.contains(&governance_term));
        }
    }

    #[test]
    fn district_queries_batch_all_districts() {
        let region = sample_region();
        let queries = generate_district_queries(&region, SourceHint::RssAggregator, &["hi", "en"]);
        assert!(!queries.is_empty());
        let all_batched: Vec<&String> = queries.iter().flat_map(|q| q.districts.iter()).collect();
        assert!(all_batched.iter().any(|d| *d == "Jaipur"));
        assert!(all_batched.iter().any(|d| *d == "Jodhpur"));
        for q in &queries {
            assert_eq!(q.level, QueryLevel::District);
        }
    }
}
