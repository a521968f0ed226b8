//! Ranking engine abstraction.
//!
//! The index service builds an engine from the full document list and wraps
//! it in an [`EngineHandle`], which probes [`EngineCapabilities`] exactly once.
//! Hits refer to documents by their position in that list.

use kwstore_types::{Bm25Config, Document};

use crate::error::SearchError;
use crate::filter::MetadataFilter;

/// A scored hit, identified by corpus position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredDoc {
    pub ordinal: usize,
    pub score: f32,
}

/// What an engine can do beyond unfiltered retrieval.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineCapabilities {
    /// Engine accepts a metadata filter in its retrieval call
    pub native_filter: bool,
}

/// A built BM25 index over a fixed corpus.
pub trait RankingEngine: Send + Sync {
    fn capabilities(&self) -> EngineCapabilities;

    /// Analyze query text into index terms.
    fn tokenize(&self, text: &str) -> Vec<String>;

    /// Top `top_k` hits by descending score.
    fn retrieve(&self, tokens: &[String], top_k: usize) -> Result<Vec<ScoredDoc>, SearchError>;

    /// Top `top_k` hits that satisfy `filter`.
    ///
    /// Returns [`SearchError::UnsupportedFilter`] when the filter (or any
    /// filter at all) cannot be evaluated natively.
    fn retrieve_filtered(
        &self,
        _tokens: &[String],
        _top_k: usize,
        _filter: &MetadataFilter,
    ) -> Result<Vec<ScoredDoc>, SearchError> {
        Err(SearchError::unsupported_filter("engine has no native filtering"))
    }

    fn num_docs(&self) -> usize;
}

/// Builds engines for a configuration.
pub trait EngineBuilder: Send + Sync {
    fn build(
        &self,
        config: &Bm25Config,
        documents: &[Document],
    ) -> Result<Box<dyn RankingEngine>, SearchError>;
}

/// A built engine with its capabilities cached.
pub struct EngineHandle {
    engine: Box<dyn RankingEngine>,
    capabilities: EngineCapabilities,
}

impl EngineHandle {
    pub fn new(engine: Box<dyn RankingEngine>) -> Self {
        let capabilities = engine.capabilities();
        Self {
            engine,
            capabilities,
        }
    }

    pub fn engine(&self) -> &dyn RankingEngine {
        self.engine.as_ref()
    }

    pub fn capabilities(&self) -> EngineCapabilities {
        self.capabilities
    }
}

impl std::fmt::Debug for EngineHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineHandle")
            .field("capabilities", &self.capabilities)
            .field("num_docs", &self.engine.num_docs())
            .finish()
    }
}
