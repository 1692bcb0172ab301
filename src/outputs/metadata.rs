//! Collection-run metadata, written once per run at the output root.

use std::collections::BTreeMap;
use std::error::Error;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{info, instrument};

/// Frozen metadata describing a single collection run, written alongside
/// the per-state article files for traceability and auditing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionMetadata {
    pub collection_timestamp: DateTime<Utc>,
    pub sources_queried: Vec<String>,
    pub query_terms_used: Vec<String>,
    pub counts: BTreeMap<String, usize>,
}

impl CollectionMetadata {
    pub fn new(
        sources_queried: Vec<String>,
        query_terms_used: Vec<String>,
        counts: BTreeMap<String, usize>,
    ) -> Self {
        CollectionMetadata {
            collection_timestamp: Utc::now(),
            sources_queried,
            query_terms_used,
            counts,
        }
    }
}

/// Write `_metadata.json` at the output root. Non-ASCII is left unescaped
/// since query terms may themselves be in a regional script.
#[instrument(level = "info", skip_all, fields(output_root = %output_root))]
pub async fn write_metadata(
    metadata: &CollectionMetadata,
    output_root: &str,
) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(output_root).await?;
    let path = format!("{}/_metadata.json", output_root.trim_end_matches('/'));
    let text = serde_json::to_string_pretty(metadata)?;
    fs::write(&path, text).await?;
    info!(path = %path, "Wrote collection metadata");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_counts_as_a_plain_object() {
        let mut counts = BTreeMap::new();
        counts.insert("discovered".to_string(), 42);
        let metadata = CollectionMetadata::new(vec!["rss-aggregator".into()], vec!["heatwave".into()], counts);
        let json = serde_json::to_string(&metadata).unwrap();
        assert!(json.contains("\"discovered\":42"));
    }
}
