//! Multilingual heat-term dictionary: `language -> category -> terms`.
//!
//! Loaded once from `heat_terms.json`. Validates that every language
//! present has every fixed category present, and every category has at
//! least one term, per 4.A's startup contract.

use crate::models::{CATEGORIES, LANGUAGES};
use once_cell::sync::Lazy;
use std::collections::HashMap;

const HEAT_TERMS_JSON: &str = include_str!("heat_terms.json");

type Dictionary = HashMap<String, HashMap<String, Vec<String>>>;

static DICTIONARY: Lazy<Dictionary> = Lazy::new(|| {
    let dict: Dictionary =
        serde_json::from_str(HEAT_TERMS_JSON).expect("heat_terms.json is not valid JSON");
    for (lang, by_category) in &dict {
        assert!(
            LANGUAGES.contains(&lang.as_str()),
            "heat_terms.json has unsupported language {}",
            lang
        );
        for category in CATEGORIES {
            let terms = by_category
                .get(category)
                .unwrap_or_else(|| panic!("language {} is missing category {}", lang, category));
            assert!(
                !terms.is_empty(),
                "language {} category {} has no terms",
                lang,
                category
            );
        }
    }
    dict
});

/// Ordered list of terms for a given language and category. Empty if the
/// language isn't present in the dictionary at all (callers should treat
/// an unknown language as having no terms, not panic).
pub fn terms(language: &str, category: &str) -> &'static [String] {
    DICTIONARY
        .get(language)
        .and_then(|by_category| by_category.get(category))
        .map(|v| v.as_slice())
        .unwrap_or(&[])
}

/// All terms across all categories for a language, in category-table order.
pub fn all_terms(language: &str) -> Vec<&'static str> {
    let Some(by_category) = DICTIONARY.get(language) else {
        return Vec::new();
    };
    CATEGORIES
        .iter()
        .flat_map(|category| by_category.get(*category))
        .flat_map(|terms| terms.iter())
        .map(|s| s.as_str())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_supported_language_has_every_category() {
        for lang in LANGUAGES {
            for category in CATEGORIES {
                assert!(
                    !terms(lang, category).is_empty(),
                    "{} / {} has no terms",
                    lang,
                    category
                );
            }
        }
    }

    #[test]
    fn unknown_language_returns_empty_not_panic() {
        assert!(terms("zz", "weather").is_empty());
        assert!(all_terms("zz").is_empty());
    }

    #[test]
    fn all_terms_covers_every_category() {
        let en_terms = all_terms("en");
        assert!(en_terms.iter().any(|t| t.contains("heatwave")));
        assert!(en_terms.iter().any(|t| t.contains("heatstroke")));
    }
}
