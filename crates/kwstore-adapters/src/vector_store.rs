//! Vector-store shaped facade over the keyword index.
//!
//! Hosts that expect `add_texts` / `similarity_search` get BM25 ranking
//! behind that interface.

use kwstore_search::{IndexService, SearchResult, SearchService};
use kwstore_types::{Bm25Config, Document, Metadata};
use serde::{Deserialize, Serialize};
use tracing::debug;
use ulid::Ulid;

use crate::config::StoreOptions;
use crate::error::AdapterError;
use crate::keyword_store::load_existing;

/// Default number of results for similarity searches.
pub const DEFAULT_K: usize = 4;

/// A document in the host's page shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageDocument {
    pub page_content: String,
    #[serde(default)]
    pub metadata: Metadata,
}

impl PageDocument {
    pub fn new(page_content: impl Into<String>) -> Self {
        Self {
            page_content: page_content.into(),
            metadata: Metadata::new(),
        }
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }
}

impl From<Document> for PageDocument {
    fn from(document: Document) -> Self {
        Self {
            page_content: document.content,
            metadata: document.metadata,
        }
    }
}

#[derive(Debug)]
pub struct VectorStore {
    index: IndexService,
}

impl VectorStore {
    pub fn new(options: StoreOptions) -> Result<Self, AdapterError> {
        let config = options.resolve()?;
        let mut index = IndexService::new(config)?;
        if options.load_existing {
            load_existing(&mut index)?;
        }
        Ok(Self { index })
    }

    pub fn with_config(config: &Bm25Config) -> Result<Self, AdapterError> {
        Self::new(StoreOptions::from_config(config))
    }

    /// Create a store and add `texts` to it.
    pub fn from_texts<S: AsRef<str>>(
        texts: &[S],
        metadatas: Option<&[Metadata]>,
        options: StoreOptions,
    ) -> Result<Self, AdapterError> {
        let mut store = Self::new(options)?;
        store.add_texts(texts, metadatas, None)?;
        Ok(store)
    }

    /// Create a store and add `documents` to it.
    pub fn from_documents(
        documents: &[PageDocument],
        options: StoreOptions,
    ) -> Result<Self, AdapterError> {
        let mut store = Self::new(options)?;
        store.add_documents(documents)?;
        Ok(store)
    }

    pub fn config(&self) -> &Bm25Config {
        self.index.config()
    }

    pub fn document_count(&self) -> usize {
        self.index.document_count()
    }

    /// Index texts and return the ids of those that were indexed.
    ///
    /// Missing ids are generated as `doc_<ulid>`. `metadatas` and `ids`,
    /// when given, must match `texts` in length. Blank texts (or blank
    /// given ids) are skipped and have no id in the result.
    pub fn add_texts<S: AsRef<str>>(
        &mut self,
        texts: &[S],
        metadatas: Option<&[Metadata]>,
        ids: Option<&[String]>,
    ) -> Result<Vec<String>, AdapterError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        if let Some(metadatas) = metadatas {
            if metadatas.len() != texts.len() {
                return Err(AdapterError::invalid_input(format!(
                    "{} texts but {} metadatas",
                    texts.len(),
                    metadatas.len()
                )));
            }
        }
        if let Some(ids) = ids {
            if ids.len() != texts.len() {
                return Err(AdapterError::invalid_input(format!(
                    "{} texts but {} ids",
                    texts.len(),
                    ids.len()
                )));
            }
        }

        let ids: Vec<String> = match ids {
            Some(ids) => ids.to_vec(),
            None => texts.iter().map(|_| format!("doc_{}", Ulid::new())).collect(),
        };

        let documents: Vec<Document> = texts
            .iter()
            .zip(&ids)
            .enumerate()
            .map(|(i, (text, id))| {
                let metadata = metadatas.map(|m| m[i].clone()).unwrap_or_default();
                Document::new(id.clone(), text.as_ref()).with_metadata_map(metadata)
            })
            .collect();

        let accepted_ids: Vec<String> = documents
            .iter()
            .filter(|d| d.validate())
            .map(|d| d.id.clone())
            .collect();

        let accepted = self.index.add_documents(documents)?;
        debug!(
            texts = texts.len(),
            accepted,
            dropped = texts.len() - accepted,
            "Added texts"
        );
        Ok(accepted_ids)
    }

    pub fn add_documents(&mut self, documents: &[PageDocument]) -> Result<Vec<String>, AdapterError> {
        let texts: Vec<&str> = documents.iter().map(|d| d.page_content.as_str()).collect();
        let metadatas: Vec<Metadata> = documents.iter().map(|d| d.metadata.clone()).collect();
        self.add_texts(&texts, Some(metadatas.as_slice()), None)
    }

    pub fn similarity_search(
        &self,
        query: &str,
        k: usize,
        filter: Option<&Metadata>,
    ) -> Result<Vec<PageDocument>, AdapterError> {
        Ok(self
            .search(query, k, filter)?
            .into_iter()
            .map(|r| r.document.into())
            .collect())
    }

    pub fn similarity_search_with_score(
        &self,
        query: &str,
        k: usize,
        filter: Option<&Metadata>,
    ) -> Result<Vec<(PageDocument, f32)>, AdapterError> {
        Ok(self
            .search(query, k, filter)?
            .into_iter()
            .map(|r| (r.document.into(), r.score))
            .collect())
    }

    /// BM25 has no embedding space to diversify over; this is plain
    /// similarity search.
    pub fn max_marginal_relevance_search(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<PageDocument>, AdapterError> {
        self.similarity_search(query, k, None)
    }

    /// Remove documents by id. `true` if at least one was removed.
    pub fn delete<S: AsRef<str>>(&mut self, ids: &[S]) -> Result<bool, AdapterError> {
        Ok(self.index.remove_documents(ids)? > 0)
    }

    fn search(
        &self,
        query: &str,
        k: usize,
        filter: Option<&Metadata>,
    ) -> Result<Vec<SearchResult>, AdapterError> {
        Ok(SearchService::new(&self.index).search(query, k, filter)?)
    }
}
