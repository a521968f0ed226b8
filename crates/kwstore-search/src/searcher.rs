//! Search over an [`IndexService`].
//!
//! Metadata filters go to the engine when it filters natively. When it does
//! not, or rejects the particular filter, candidates are over-fetched
//! unfiltered and checked one by one.

use serde_json::{Map, Value};
use tracing::debug;

use kwstore_types::Document;

use crate::engine::{EngineHandle, RankingEngine, ScoredDoc};
use crate::error::SearchError;
use crate::filter::MetadataFilter;
use crate::indexer::IndexService;

/// Smallest candidate window for post-filtering.
const MIN_FALLBACK_WINDOW: usize = 32;

/// Candidates fetched per requested result on the first fallback pass.
const FALLBACK_OVERFETCH: usize = 4;

/// A ranked search hit.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub document: Document,
    /// BM25 score from the engine
    pub score: f32,
    /// 1-based position after filtering
    pub rank: usize,
}

/// Read-only search over an index service.
pub struct SearchService<'a> {
    index: &'a IndexService,
}

impl<'a> SearchService<'a> {
    pub fn new(index: &'a IndexService) -> Self {
        Self { index }
    }

    /// Search with an optional metadata filter.
    pub fn search(
        &self,
        query: &str,
        top_k: usize,
        filter: Option<&Map<String, Value>>,
    ) -> Result<Vec<SearchResult>, SearchError> {
        let handle = self.handle()?;
        let filter = parse_filter(filter);
        self.run(handle, query, top_k, filter.as_ref())
    }

    /// Run several queries with the same limit and filter.
    pub fn batch_search<S: AsRef<str>>(
        &self,
        queries: &[S],
        top_k: usize,
        filter: Option<&Map<String, Value>>,
    ) -> Result<Vec<Vec<SearchResult>>, SearchError> {
        if queries.is_empty() {
            return Err(SearchError::EmptyQueries);
        }
        let handle = self.handle()?;
        let filter = parse_filter(filter);

        queries
            .iter()
            .map(|q| self.run(handle, q.as_ref(), top_k, filter.as_ref()))
            .collect()
    }

    fn handle(&self) -> Result<&'a EngineHandle, SearchError> {
        self.index.handle().ok_or(SearchError::IndexNotAvailable)
    }

    fn run(
        &self,
        handle: &EngineHandle,
        query: &str,
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<SearchResult>, SearchError> {
        if query.trim().is_empty() {
            return Err(SearchError::EmptyQuery);
        }
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let engine = handle.engine();
        let tokens = engine.tokenize(query);
        if tokens.is_empty() {
            debug!(query, "Query produced no tokens");
            return Ok(Vec::new());
        }

        let hits = match filter {
            None => engine.retrieve(&tokens, top_k)?,
            Some(filter) => self.retrieve_filtered(handle, &tokens, top_k, filter)?,
        };

        let documents = self.index.documents();
        let results: Vec<SearchResult> = hits
            .into_iter()
            .filter_map(|hit| documents.get(hit.ordinal).map(|d| (d, hit.score)))
            .enumerate()
            .map(|(i, (document, score))| SearchResult {
                document: document.clone(),
                score,
                rank: i + 1,
            })
            .collect();

        debug!(
            query,
            top_k,
            filtered = filter.is_some(),
            results = results.len(),
            "Keyword search complete"
        );
        Ok(results)
    }

    fn retrieve_filtered(
        &self,
        handle: &EngineHandle,
        tokens: &[String],
        top_k: usize,
        filter: &MetadataFilter,
    ) -> Result<Vec<ScoredDoc>, SearchError> {
        if handle.capabilities().native_filter {
            match handle.engine().retrieve_filtered(tokens, top_k, filter) {
                Ok(hits) => return Ok(hits),
                Err(e) if e.is_filter_mismatch() => {
                    debug!(error = %e, "Native filter rejected, post-filtering");
                }
                Err(e) => return Err(e),
            }
        }
        self.post_filter(handle.engine(), tokens, top_k, filter)
    }

    /// Over-fetch unfiltered candidates and keep the first `top_k` matches,
    /// doubling the window until enough match or the corpus runs out.
    fn post_filter(
        &self,
        engine: &dyn RankingEngine,
        tokens: &[String],
        top_k: usize,
        filter: &MetadataFilter,
    ) -> Result<Vec<ScoredDoc>, SearchError> {
        let documents = self.index.documents();
        let total = engine.num_docs();
        let top_k = top_k.min(total);
        let mut window = top_k
            .saturating_mul(FALLBACK_OVERFETCH)
            .max(MIN_FALLBACK_WINDOW)
            .min(total);

        loop {
            let candidates = engine.retrieve(tokens, window)?;
            let exhausted = candidates.len() < window || window >= total;

            let matched: Vec<ScoredDoc> = candidates
                .into_iter()
                .filter(|hit| {
                    documents
                        .get(hit.ordinal)
                        .is_some_and(|d| filter.matches(Some(&d.metadata)))
                })
                .take(top_k)
                .collect();

            if matched.len() >= top_k || exhausted {
                debug!(window, matched = matched.len(), "Post-filter complete");
                return Ok(matched);
            }
            window = window.saturating_mul(2).min(total);
        }
    }
}

fn parse_filter(filter: Option<&Map<String, Value>>) -> Option<MetadataFilter> {
    filter
        .map(MetadataFilter::parse)
        .filter(|f| !f.is_empty())
}
