//! Search error types.

use kwstore_types::ConfigError;
use thiserror::Error;

/// Errors that can occur during indexing, search and persistence.
#[derive(Debug, Error)]
pub enum SearchError {
    /// Tantivy index error
    #[error("Tantivy error: {0}")]
    Tantivy(#[from] tantivy::TantivyError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot encoding error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Analyzer could not be assembled (unknown stemmer, stop words, tokenizer)
    #[error("Analyzer error: {0}")]
    Analyzer(String),

    /// No valid document was supplied to index creation
    #[error("Cannot create an index from an empty corpus")]
    EmptyCorpus,

    /// Query was blank
    #[error("Query must not be empty")]
    EmptyQuery,

    /// Batch search received no queries
    #[error("Query list must not be empty")]
    EmptyQueries,

    /// Search or save attempted before any document was indexed
    #[error("Index not available")]
    IndexNotAvailable,

    /// Save or load attempted without a configured index path
    #[error("Index path not configured")]
    IndexPathNotConfigured,

    /// Snapshot file does not exist
    #[error("Index not found at path: {0}")]
    IndexNotFound(String),

    /// Snapshot file exists but cannot be decoded
    #[error("Invalid index snapshot: {0}")]
    Snapshot(String),

    /// Engine cannot evaluate the filter natively
    #[error("Filter not supported by engine: {0}")]
    UnsupportedFilter(String),
}

impl SearchError {
    pub fn analyzer(msg: impl Into<String>) -> Self {
        Self::Analyzer(msg.into())
    }

    pub fn unsupported_filter(msg: impl Into<String>) -> Self {
        Self::UnsupportedFilter(msg.into())
    }

    /// Whether a native filtered retrieval failed in a way the fallback handles.
    pub fn is_filter_mismatch(&self) -> bool {
        matches!(self, SearchError::UnsupportedFilter(_))
    }
}
