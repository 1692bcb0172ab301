//! Title heat-signal pre-filter.
//!
//! A fast, regex-based keyword check over raw titles, run immediately after
//! Phase 2 collection — before the optional LLM relevance stage and before
//! extraction ever fetches a page. Independent of both
//! [`crate::dedup::relevance`] (needs extracted body text) and
//! `data::heat_terms` (the larger 10-category dictionary used for query
//! generation and Stage-3 scoring): this is a small, deliberately curated set
//! of words that are unambiguously about heat or temperature. Generic words
//! like "alert", "school closed", or "power cut" are left out on purpose —
//! they match plenty of non-heat content too.

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};

use crate::models::ArticleRef;

const HEAT_SIGNALS: &[&str] = &[
    // English
    "heat",
    "heatwave",
    "heat wave",
    "hot",
    "scorching",
    "sweltering",
    "sunstroke",
    "sun stroke",
    "heatstroke",
    "heat stroke",
    "temperature",
    "mercury",
    "celsius",
    "loo ", // trailing space avoids matching "look", "loop"
    "drought",
    "water crisis",
    "water shortage",
    // Hindi
    "गर्मी",
    "लू",
    "तापमान",
    "पारा",
    "सूर्याघात",
    "तापाघात",
    "हीट",
    "धूप",
    "उष्ण",
    "ग्रीष्म",
    // Tamil
    "வெப்பம்",
    "வெப்ப அலை",
    "கோடை",
    "வெயில்",
    // Telugu
    "వేడి",
    "ఉష్ణ",
    "ఎండ",
    "సూర్యాఘాతం",
    // Bengali
    "গরম",
    "তাপ",
    "তাপমাত্রা",
    "দাবদাহ",
    "লু",
    // Marathi
    "उष्णता",
    "उन्हाळा",
    "तापमान",
    "ऊन",
    // Gujarati
    "ગરમી",
    "તાપમાન",
    "લૂ",
    "ઉષ્ણ",
    // Kannada
    "ಬಿಸಿ",
    "ಉಷ್ಣ",
    "ತಾಪಮಾನ",
    "ಬಿಸಿಗಾಳಿ",
    // Malayalam
    "ചൂട്",
    "ഉഷ്ണ",
    "താപനില",
    "വെയിൽ",
    // Odia
    "ଗରମ",
    "ତାପମାତ୍ରା",
    "ଉଷ୍ଣ",
    // Punjabi
    "ਗਰਮੀ",
    "ਤਾਪਮਾਨ",
    "ਲੂ",
    // Assamese
    "গৰম",
    "তাপমাত্ৰা",
    // Urdu
    "گرمی",
    "لو",
    "ہیٹ",
    "شدید گرمی",
    // Nepali
    "गर्मी",
    "तापक्रम",
    "लू",
];

static HEAT_PATTERN: Lazy<Regex> = Lazy::new(|| {
    let pattern = HEAT_SIGNALS
        .iter()
        .map(|term| regex::escape(term))
        .collect::<Vec<_>>()
        .join("|");
    RegexBuilder::new(&pattern)
        .case_insensitive(true)
        .build()
        .expect("heat signal pattern is valid")
});

/// Whether a title contains at least one heat-signal word, in any supported
/// language.
pub fn has_title_signal(article_ref: &ArticleRef) -> bool {
    HEAT_PATTERN.is_match(&article_ref.title)
}

/// Filter a batch of refs down to those with a title heat-signal hit.
pub fn filter_by_title_signal(refs: Vec<ArticleRef>) -> Vec<ArticleRef> {
    refs.into_iter().filter(has_title_signal).collect()
}
