//! Region and district tables.
//!
//! Loaded once from `india_geo.json`, embedded at compile time. Validates
//! that every region has at least one supported language (drawn from the
//! fixed 14-code set) and at least one district.

use crate::models::{District, Region, RegionKind, LANGUAGES};
use once_cell::sync::Lazy;
use serde::Deserialize;

const GEO_JSON: &str = include_str!("india_geo.json");

#[derive(Deserialize)]
struct RawGeo {
    regions: Vec<Region>,
}

static REGIONS: Lazy<Vec<Region>> = Lazy::new(|| {
    let raw: RawGeo = serde_json::from_str(GEO_JSON).expect("india_geo.json is not valid JSON");
    for region in &raw.regions {
        assert!(
            !region.languages.is_empty(),
            "region {} has no languages",
            region.slug
        );
        assert!(
            !region.districts.is_empty(),
            "region {} has no districts",
            region.slug
        );
        for lang in &region.languages {
            assert!(
                LANGUAGES.contains(&lang.as_str()),
                "region {} declares unsupported language {}",
                region.slug,
                lang
            );
        }
    }
    raw.regions
});

/// All loaded regions, in the order they appear in the reference data.
pub fn all_regions() -> &'static [Region] {
    &REGIONS
}

/// Look up a region by its url-safe slug.
pub fn region_by_slug(slug: &str) -> Option<&'static Region> {
    REGIONS.iter().find(|r| r.slug == slug)
}

/// Look up a region by its display name, as stored on an `ArticleRef`'s
/// `state` field.
pub fn region_by_name(name: &str) -> Option<&'static Region> {
    REGIONS.iter().find(|r| r.name == name)
}

/// Whether `kind` round-trips through JSON as expected (sanity check used
/// by the startup validator in `main`, kept here since it concerns geo
/// data specifically).
pub fn describe_kind(kind: RegionKind) -> &'static str {
    match kind {
        RegionKind::State => "state",
        RegionKind::UnionTerritory => "union-territory",
    }
}

pub fn all_districts(region: &Region) -> &[District] {
    &region.districts
}
