//! Read-once, immutable reference data: regions, heat terms, exclusions.
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`geo`] | Region/district tables loaded from `india_geo.json` |
//! | [`heat_terms`] | Multilingual heat-term dictionary loaded from `heat_terms.json` |
//! | [`exclusions`] | Precompiled exclusion regular expressions |
//!
//! Every table here is embedded into the binary at compile time via
//! `include_str!` and parsed once into a [`once_cell::sync::Lazy`] static.
//! There is no I/O after startup. Loading panics with a descriptive message
//! if the data violates the invariants this crate depends on elsewhere
//! (e.g. the scheduler assuming every query language is present in the
//! heat-term dictionary).

pub mod exclusions;
pub mod geo;
pub mod heat_terms;

/// Force every embedded reference table to load and validate now, rather
/// than lazily on first use. Called once from `main` so a malformed table
/// is a startup failure, not a failure partway through a collection run.
pub fn validate_all() {
    let _ = geo::all_regions();
    let _ = exclusions::exclusion_patterns();
    for region in geo::all_regions() {
        for language in &region.languages {
            let _ = heat_terms::all_terms(language);
        }
    }
}
