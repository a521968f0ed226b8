//! Keyword store facade.

use std::path::PathBuf;

use kwstore_search::{IndexService, SearchError, SearchService};
use kwstore_types::{Bm25Config, Document, Metadata};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};
use ulid::Ulid;

use crate::adapter::{DocumentProcessor, KeywordSearch, SearchHit, DEFAULT_RETRIEVE_LIMIT};
use crate::config::StoreOptions;
use crate::error::AdapterError;

/// BM25 keyword store exposed through [`KeywordSearch`] and
/// [`DocumentProcessor`].
#[derive(Debug)]
pub struct KeywordStore {
    index: IndexService,
}

impl KeywordStore {
    /// Resolve configuration and build the store.
    ///
    /// With `index_path` set and `load_existing` on, an existing snapshot is
    /// loaded. A missing or unreadable snapshot leaves the store empty.
    pub fn new(options: StoreOptions) -> Result<Self, AdapterError> {
        let config = options.resolve()?;
        let mut store = Self {
            index: IndexService::new(config)?,
        };

        if options.load_existing {
            load_existing(&mut store.index)?;
        }

        info!(
            k1 = store.index.config().k1,
            b = store.index.config().b,
            tokenizer = %store.index.config().tokenizer,
            docs = store.index.document_count(),
            "Keyword store ready"
        );
        Ok(store)
    }

    /// Build from a ready configuration, ignoring the environment.
    pub fn with_config(config: &Bm25Config) -> Result<Self, AdapterError> {
        Self::new(StoreOptions::from_config(config))
    }

    pub fn config(&self) -> &Bm25Config {
        self.index.config()
    }

    /// Effective configuration as a JSON object.
    pub fn get_config(&self) -> Map<String, Value> {
        self.index.config().to_map()
    }

    pub fn get_document(&self, id: &str) -> Option<&Document> {
        self.index.get_document(id)
    }

    pub fn index(&self) -> &IndexService {
        &self.index
    }

    pub fn save_index(&self) -> Result<PathBuf, AdapterError> {
        Ok(self.index.save_index()?)
    }

    pub fn load_index(&mut self) -> Result<usize, AdapterError> {
        Ok(self.index.load_index()?)
    }
}

/// Load the configured snapshot if there is one. Missing and malformed
/// snapshots are logged; other failures propagate.
pub(crate) fn load_existing(index: &mut IndexService) -> Result<(), AdapterError> {
    if index.config().index_path.is_none() {
        return Ok(());
    }
    match index.load_index() {
        Ok(count) => {
            debug!(docs = count, "Loaded existing snapshot");
            Ok(())
        }
        Err(SearchError::IndexNotFound(path)) => {
            debug!(path = %path, "No existing snapshot");
            Ok(())
        }
        Err(SearchError::Snapshot(reason)) => {
            warn!(reason = %reason, "Ignoring unreadable snapshot");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

/// Give blank ids a generated `doc_<ulid>` id.
fn with_generated_id(mut document: Document) -> Document {
    if document.id.trim().is_empty() {
        document.id = format!("doc_{}", Ulid::new());
    }
    document
}

impl KeywordSearch for KeywordStore {
    fn retrieve(
        &self,
        query: &str,
        limit: Option<usize>,
        metadata_filter: Option<&Metadata>,
    ) -> Result<Vec<SearchHit>, AdapterError> {
        let limit = limit.unwrap_or(DEFAULT_RETRIEVE_LIMIT);
        let results = SearchService::new(&self.index).search(query, limit, metadata_filter)?;

        Ok(results
            .into_iter()
            .map(|r| SearchHit {
                document_id: r.document.id.clone(),
                metadata: r.document.metadata.clone(),
                score: r.score,
                document: r.document,
            })
            .collect())
    }

    fn index_documents(&mut self, documents: Vec<Document>) -> Result<(), AdapterError> {
        let documents: Vec<Document> = documents.into_iter().map(with_generated_id).collect();
        let accepted = self.index.add_documents(documents)?;
        debug!(accepted, total = self.index.document_count(), "Indexed documents");
        Ok(())
    }

    fn remove_document(&mut self, document_id: &str) -> Result<bool, AdapterError> {
        Ok(self.index.remove_document(document_id)?)
    }

    fn update_document(&mut self, document: Document) -> Result<bool, AdapterError> {
        Ok(self.index.update_document(document)?)
    }

    fn get_document_count(&self) -> usize {
        self.index.document_count()
    }

    fn clear_index(&mut self) -> Result<(), AdapterError> {
        self.index.clear();
        Ok(())
    }
}

impl DocumentProcessor for KeywordStore {
    /// Index the documents and hand them back unchanged.
    fn process(&mut self, documents: Vec<Document>) -> Result<Vec<Document>, AdapterError> {
        self.index_documents(documents.clone())?;
        Ok(documents)
    }
}
