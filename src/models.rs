//! Core data model: regions, districts, heat terms, articles, and queries.
//!
//! These are the "frozen by convention" value types that flow through the
//! pipeline. None of them expose mutation; derived values are produced with
//! `with_*` methods that return a new, independent copy.

use chrono::{DateTime, TimeZone};
use chrono_tz::Asia::Kolkata;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// The fourteen supported language codes, in a fixed canonical order.
pub const LANGUAGES: [&str; 14] = [
    "en", "hi", "bn", "ta", "te", "mr", "gu", "kn", "ml", "or", "pa", "as", "ur", "ne",
];

/// The fixed set of heat-term categories. Query generation only uses a
/// subset of these (see [`QUERY_CATEGORIES`]); all of them participate in
/// relevance scoring.
pub const CATEGORIES: [&str; 10] = [
    "weather",
    "health",
    "temperature",
    "water",
    "power",
    "agriculture",
    "labor",
    "governance",
    "urban-infra",
    "education",
];

/// The categories used to build search query strings — a strict subset of
/// [`CATEGORIES`] chosen for specificity.
pub const QUERY_CATEGORIES: [&str; 3] = ["weather", "health", "temperature"];

/// Which backend a [`Query`] or [`ArticleRef`] originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceHint {
    RssAggregator,
    JsonApiA,
    JsonApiB,
}

impl SourceHint {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceHint::RssAggregator => "rss-aggregator",
            SourceHint::JsonApiA => "json-api-A",
            SourceHint::JsonApiB => "json-api-B",
        }
    }
}

/// A district within a [`Region`]: just a name and a url-safe slug.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct District {
    pub name: String,
    pub slug: String,
}

/// Whether a [`Region`] is a state or a union territory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RegionKind {
    State,
    UnionTerritory,
}

/// An Indian state or union territory with a fixed set of districts.
///
/// `languages` is ordered: the primary regional language first (if any),
/// then others, with English always present somewhere in the list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub name: String,
    pub slug: String,
    pub kind: RegionKind,
    pub languages: Vec<String>,
    pub districts: Vec<District>,
}

impl Region {
    /// The primary regional language, i.e. the first entry in `languages`
    /// that isn't English, if one exists.
    pub fn primary_language(&self) -> Option<&str> {
        self.languages.iter().map(|s| s.as_str()).find(|&l| l != "en")
    }

    /// The two "query languages" for this region: the primary regional
    /// language (if distinct from English) plus English, always exactly
    /// one or two entries.
    pub fn query_languages(&self) -> Vec<&str> {
        let mut langs = Vec::with_capacity(2);
        if let Some(primary) = self.primary_language() {
            langs.push(primary);
        }
        langs.push("en");
        langs
    }
}

/// An immutable reference to a discovered article, before extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleRef {
    pub title: String,
    pub url: String,
    pub source_name: String,
    pub timestamp: DateTime<Tz>,
    pub language: String,
    pub state: String,
    pub district: Option<String>,
    pub search_term: String,
}

impl ArticleRef {
    /// Return a copy of this ref with the district field overridden.
    pub fn with_district(&self, district: Option<String>) -> Self {
        ArticleRef {
            district,
            ..self.clone()
        }
    }

    /// Return a copy of this ref with the URL overridden, used once a
    /// redirect URL has been resolved to the publisher's real address.
    pub fn with_url(&self, url: String) -> Self {
        ArticleRef {
            url,
            ..self.clone()
        }
    }
}

/// An [`ArticleRef`] extended with extracted full text and a relevance
/// score computed by the dedup/relevance stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    #[serde(flatten)]
    pub reference: ArticleRef,
    pub full_text: Option<String>,
    pub relevance_score: f64,
}

impl Article {
    /// Build an `Article` directly from a ref, with no text and a zero
    /// score. Used when extraction fails so every ref still yields exactly
    /// one `Article`.
    pub fn without_text(reference: ArticleRef) -> Self {
        Article {
            reference,
            full_text: None,
            relevance_score: 0.0,
        }
    }

    pub fn with_text(reference: ArticleRef, full_text: String) -> Self {
        Article {
            reference,
            full_text: Some(full_text),
            relevance_score: 0.0,
        }
    }

    /// Return a copy with an overridden relevance score.
    pub fn with_score(&self, relevance_score: f64) -> Self {
        Article {
            relevance_score,
            ..self.clone()
        }
    }

    /// Return a copy with an overridden district on the underlying ref.
    pub fn with_district(&self, district: Option<String>) -> Self {
        Article {
            reference: self.reference.with_district(district),
            ..self.clone()
        }
    }

    /// Intra-dedup tiebreaker quality score: prefers longer extracted
    /// text, a set district, and an identified source.
    pub fn quality_score(&self) -> u32 {
        let mut score = match &self.full_text {
            Some(text) => 100 + text.len() as u32,
            None => 0,
        };
        if self.reference.district.is_some() {
            score += 10;
        }
        if !self.reference.source_name.is_empty() {
            score += 5;
        }
        score
    }
}

/// A single search query destined for one backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryLevel {
    State,
    District,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Query {
    pub query_string: String,
    pub language: String,
    pub region_name: String,
    pub region_slug: String,
    pub level: QueryLevel,
    pub category: Option<String>,
    pub source_hint: SourceHint,
    pub districts: Vec<String>,
}

impl Query {
    /// A stable 16-hex-char fingerprint over the fields that the
    /// checkpoint store keys on. Independent of process, endianness, and
    /// insertion order, since it hashes a canonical tuple of owned strings.
    pub fn fingerprint(&self) -> String {
        let level = match self.level {
            QueryLevel::State => "state",
            QueryLevel::District => "district",
        };
        let mut hasher = Sha256::new();
        hasher.update(self.source_hint.as_str().as_bytes());
        hasher.update(b"\0");
        hasher.update(self.region_slug.as_bytes());
        hasher.update(b"\0");
        hasher.update(self.language.as_bytes());
        hasher.update(b"\0");
        hasher.update(level.as_bytes());
        hasher.update(b"\0");
        hasher.update(self.query_string.as_bytes());
        let digest = hasher.finalize();
        hex_prefix(&digest, 8)
    }
}

fn hex_prefix(bytes: &[u8], n: usize) -> String {
    bytes[..n].iter().map(|b| format!("{:02x}", b)).collect()
}

/// The outcome of running a single [`Query`] through a source scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    pub query: Query,
    pub source_name: String,
    pub articles: Vec<ArticleRef>,
    pub success: bool,
    pub error: Option<String>,
}

impl QueryResult {
    pub fn ok(query: Query, source_name: impl Into<String>, articles: Vec<ArticleRef>) -> Self {
        QueryResult {
            query,
            source_name: source_name.into(),
            articles,
            success: true,
            error: None,
        }
    }

    pub fn ok_with_reason(
        query: Query,
        source_name: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        QueryResult {
            query,
            source_name: source_name.into(),
            articles: Vec::new(),
            success: true,
            error: Some(reason.into()),
        }
    }

    pub fn failed(query: Query, source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        QueryResult {
            query,
            source_name: source_name.into(),
            articles: Vec::new(),
            success: false,
            error: Some(reason.into()),
        }
    }
}

/// Normalise a naive or already-aware instant to India Standard Time.
/// Naive instants are interpreted as already being in the given source
/// zone (UTC for JSON backends, IST for the RSS backend) before converting.
pub fn to_ist(dt: DateTime<chrono::Utc>) -> DateTime<Tz> {
    dt.with_timezone(&Kolkata)
}

pub fn ist_now() -> DateTime<Tz> {
    chrono::Utc::now().with_timezone(&Kolkata)
}

/// Parse a naive timestamp (no offset in the source text) as IST.
pub fn naive_as_ist(naive: chrono::NaiveDateTime) -> DateTime<Tz> {
    Kolkata.from_local_datetime(&naive).single().unwrap_or_else(|| {
        Kolkata
            .from_local_datetime(&naive)
            .earliest()
            .expect("Kolkata has no DST, local datetime is always unambiguous")
    })
}
