//! Precompiled, case-insensitive exclusion patterns used by the high-recall
//! relevance filter in `dedup::relevance`.

use once_cell::sync::Lazy;
use regex::Regex;

const EXCLUSIONS_JSON: &str = include_str!("exclusion_patterns.json");

static PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    let raw: Vec<String> =
        serde_json::from_str(EXCLUSIONS_JSON).expect("exclusion_patterns.json is not valid JSON");
    raw.iter()
        .map(|pattern| {
            Regex::new(&format!("(?i){}", pattern))
                .unwrap_or_else(|e| panic!("invalid exclusion pattern {:?}: {}", pattern, e))
        })
        .collect()
});

/// All precompiled, case-insensitive exclusion patterns.
pub fn exclusion_patterns() -> &'static [Regex] {
    &PATTERNS
}
