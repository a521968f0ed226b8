//! On-disk index snapshots.
//!
//! A snapshot is one JSON file holding the configuration and the full
//! document list. The ranking structure is rebuilt on load.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use kwstore_types::{Bm25Config, Document};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::SearchError;

pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexSnapshot {
    pub format_version: u32,

    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub saved_at: DateTime<Utc>,

    /// Configuration in effect when the snapshot was written
    pub config: Bm25Config,

    pub documents: Vec<Document>,
}

impl IndexSnapshot {
    pub fn new(config: Bm25Config, documents: Vec<Document>) -> Self {
        Self {
            format_version: SNAPSHOT_FORMAT_VERSION,
            saved_at: Utc::now(),
            config,
            documents,
        }
    }

    /// Write atomically: temp file in the same directory, then rename.
    pub fn write(&self, path: &Path) -> Result<(), SearchError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let bytes = serde_json::to_vec(self)?;
        let tmp = temp_path(path);
        fs::write(&tmp, bytes)?;
        if let Err(e) = fs::rename(&tmp, path) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }

        debug!(path = ?path, docs = self.documents.len(), "Wrote index snapshot");
        Ok(())
    }

    /// Read and decode a snapshot.
    ///
    /// Missing file -> [`SearchError::IndexNotFound`]; undecodable content
    /// or an unknown format version -> [`SearchError::Snapshot`].
    pub fn read(path: &Path) -> Result<Self, SearchError> {
        if !path.is_file() {
            return Err(SearchError::IndexNotFound(path.display().to_string()));
        }

        let bytes = fs::read(path)?;
        let snapshot: IndexSnapshot =
            serde_json::from_slice(&bytes).map_err(|e| SearchError::Snapshot(e.to_string()))?;

        if snapshot.format_version != SNAPSHOT_FORMAT_VERSION {
            return Err(SearchError::Snapshot(format!(
                "unsupported format version {}",
                snapshot.format_version
            )));
        }
        Ok(snapshot)
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
