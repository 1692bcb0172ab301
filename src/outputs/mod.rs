//! Output writers: per-state/date/district `articles.json` + `articles.csv`,
//! and a top-level `_metadata.json` describing the collection run.
//!
//! # Output Structure
//!
//! ```text
//! output_root/
//! ├── rajasthan/
//! │   └── 2026-05-06/
//! │       ├── articles.json       -- state-level articles
//! │       ├── articles.csv
//! │       └── jaipur/
//! │           ├── articles.json   -- district-level articles
//! │           └── articles.csv
//! └── _metadata.json
//! ```
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`writer`] | Groups articles by state/date/district and writes JSON + CSV |
//! | [`metadata`] | Writes `_metadata.json` for the run |

pub mod metadata;
pub mod writer;
