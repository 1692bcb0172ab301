//! Durable set of completed query fingerprints, making a collection run
//! resumable after a crash.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, instrument};

use crate::models::Query;

#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("failed to read checkpoint file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("checkpoint file {path} is not valid JSON: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write checkpoint file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CheckpointFile {
    completed_queries: Vec<String>,
}

/// Tracks which query fingerprints have already completed in this run (or
/// a prior, crashed run resumed from the same path).
pub struct CheckpointStore {
    path: PathBuf,
    completed: HashSet<String>,
}

impl CheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        CheckpointStore {
            path: path.into(),
            completed: HashSet::new(),
        }
    }

    /// Read the JSON file if present and populate the in-memory set. A
    /// missing file is treated as an empty checkpoint, not an error.
    #[instrument(level = "info", skip(self), fields(path = %self.path.display()))]
    pub async fn load(&mut self) -> Result<(), CheckpointError> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("no checkpoint file found, starting fresh");
                return Ok(());
            }
            Err(e) => {
                return Err(CheckpointError::Read {
                    path: self.path.clone(),
                    source: e,
                })
            }
        };
        let parsed: CheckpointFile =
            serde_json::from_str(&contents).map_err(|e| CheckpointError::Parse {
                path: self.path.clone(),
                source: e,
            })?;
        info!(
            completed = parsed.completed_queries.len(),
            "loaded checkpoint"
        );
        self.completed = parsed.completed_queries.into_iter().collect();
        Ok(())
    }

    pub fn is_completed(&self, query: &Query) -> bool {
        self.completed.contains(&query.fingerprint())
    }

    pub fn mark_completed(&mut self, query: &Query) {
        self.completed.insert(query.fingerprint());
    }

    /// Atomically write the sorted set as JSON: write to a sibling temp
    /// file, then rename over the checkpoint path. A crash mid-write
    /// leaves the previous file intact since the rename is the only step
    /// that touches the real path.
    #[instrument(level = "debug", skip(self), fields(path = %self.path.display()))]
    pub async fn save(&self) -> Result<(), CheckpointError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| CheckpointError::Write {
                        path: self.path.clone(),
                        source: e,
                    })?;
            }
        }
        let mut sorted: Vec<String> = self.completed.iter().cloned().collect();
        sorted.sort();
        let body = CheckpointFile {
            completed_queries: sorted,
        };
        let json = serde_json::to_string_pretty(&body).expect("checkpoint body is serializable");

        let tmp_path = tmp_path_for(&self.path);
        tokio::fs::write(&tmp_path, json)
            .await
            .map_err(|e| CheckpointError::Write {
                path: tmp_path.clone(),
                source: e,
            })?;
        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .map_err(|e| CheckpointError::Write {
                path: self.path.clone(),
                source: e,
            })?;
        Ok(())
    }

    /// Delete the checkpoint file on successful completion of the whole
    /// pipeline. Missing-file is not an error.
    #[instrument(level = "info", skip(self), fields(path = %self.path.display()))]
    pub async fn clear(&self) -> Result<(), CheckpointError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CheckpointError::Write {
                path: self.path.clone(),
                source: e,
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{QueryLevel, SourceHint};

    fn sample_query(query_string: &str) -> Query {
        Query {
            query_string: query_string.into(),
            language: "en".into(),
            region_name: "Rajasthan".into(),
            region_slug: "rajasthan".into(),
            level: QueryLevel::State,
            category: Some("weather".into()),
            source_hint: SourceHint::RssAggregator,
            districts: vec![],
        }
    }

    #[tokio::test]
    async fn missing_file_loads_as_empty() {
        let dir = tempdir();
        let mut store = CheckpointStore::new(dir.join("checkpoint.json"));
        store.load().await.unwrap();
        assert!(!store.is_completed(&sample_query("heatwave")));
    }

    #[tokio::test]
    async fn mark_and_save_then_reload_sees_completion() {
        let dir = tempdir();
        let path = dir.join("checkpoint.json");
        let query = sample_query("heatwave Rajasthan");

        let mut store = CheckpointStore::new(&path);
        store.load().await.unwrap();
        store.mark_completed(&query);
        store.save().await.unwrap();

        let mut reloaded = CheckpointStore::new(&path);
        reloaded.load().await.unwrap();
        assert!(reloaded.is_completed(&query));
    }

    #[tokio::test]
    async fn clear_removes_the_file() {
        let dir = tempdir();
        let path = dir.join("checkpoint.json");
        let mut store = CheckpointStore::new(&path);
        store.mark_completed(&sample_query("heatwave"));
        store.save().await.unwrap();
        assert!(tokio::fs::metadata(&path).await.is_ok());
        store.clear().await.unwrap();
        assert!(tokio::fs::metadata(&path).await.is_err());
    }

    #[tokio::test]
    async fn clear_on_missing_file_is_not_an_error() {
        let dir = tempdir();
        let store = CheckpointStore::new(dir.join("nope.json"));
        store.clear().await.unwrap();
    }

    fn tempdir() -> PathBuf {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        let n = COUNTER.fetch_add(1, Ordering::SeqCst);
        let mut dir = std::env::temp_dir();
        dir.push(format!(
            "heatwatch_checkpoint_test_{}_{}",
            std::process::id(),
            n
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }
}
