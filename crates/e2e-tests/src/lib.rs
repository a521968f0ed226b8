//! End-to-end test infrastructure for the keyword store.
//!
//! Provides a shared TestHarness and fixture helpers for tests that drive
//! the adapters the way a host would.

use std::path::PathBuf;

use kwstore_adapters::{KeywordSearch, KeywordStore, StoreOptions, VectorStore};
use kwstore_types::{ConfigOverrides, Document, Metadata};
use serde_json::Value;

/// Shared test harness for E2E tests.
///
/// Owns a temp directory and a snapshot path inside it. Stores built by the
/// harness ignore the process environment.
pub struct TestHarness {
    /// Keeps temp dir alive for the lifetime of the harness
    pub _temp_dir: tempfile::TempDir,
    /// Snapshot file for save/load
    pub index_path: PathBuf,
}

impl TestHarness {
    pub fn new() -> Self {
        let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let index_path = temp_dir.path().join("bm25").join("index.json");

        Self {
            _temp_dir: temp_dir,
            index_path,
        }
    }

    /// Overrides using the simple tokenizer and the harness snapshot path.
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides::new()
            .tokenizer("simple")
            .index_path(self.index_path.to_string_lossy())
    }

    pub fn options(&self) -> StoreOptions {
        StoreOptions::new()
            .without_env()
            .with_overrides(self.overrides())
    }

    pub fn keyword_store(&self) -> KeywordStore {
        KeywordStore::new(self.options()).expect("Failed to create keyword store")
    }

    /// Keyword store preloaded with [`sample_corpus`].
    pub fn indexed_store(&self) -> KeywordStore {
        let mut store = self.keyword_store();
        store
            .index_documents(sample_corpus())
            .expect("Failed to index sample corpus");
        store
    }

    pub fn vector_store(&self) -> VectorStore {
        VectorStore::new(self.options()).expect("Failed to create vector store")
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Build a metadata map from a JSON object literal.
pub fn metadata(value: Value) -> Metadata {
    match value {
        Value::Object(map) => map,
        other => panic!("metadata must be a JSON object, got {other}"),
    }
}

/// The two-document Python corpus.
pub fn python_documents() -> Vec<Document> {
    vec![
        Document::new("doc1", "Python programming language")
            .with_metadata("category", "programming")
            .with_metadata("level", 1),
        Document::new("doc2", "Machine learning with Python")
            .with_metadata("category", "ai")
            .with_metadata("level", 3),
    ]
}

/// A mixed corpus with varied metadata types.
pub fn sample_corpus() -> Vec<Document> {
    let mut docs = python_documents();
    docs.extend([
        Document::new("doc3", "Rust systems programming with ownership")
            .with_metadata_map(metadata(serde_json::json!({
                "category": "programming",
                "level": 4,
                "stable": true,
                "year": 2015
            }))),
        Document::new("doc4", "Deep learning frameworks in Python and Rust")
            .with_metadata_map(metadata(serde_json::json!({
                "category": "ai",
                "level": 5,
                "stable": false,
                "reviewer": null
            }))),
        Document::new("doc5", "Web development with Python frameworks")
            .with_metadata("category", "web"),
        Document::new("doc6", "Database indexing and query planning"),
    ]);
    docs
}

/// Ids of hits in rank order.
pub fn hit_ids(hits: &[kwstore_adapters::SearchHit]) -> Vec<String> {
    hits.iter().map(|h| h.document_id.clone()).collect()
}
