//! Host-facing traits.
//!
//! [`KeywordSearch`] is the retrieval interface a RAG host drives;
//! [`DocumentProcessor`] lets the same store sit in a document pipeline.

use kwstore_types::{Document, Metadata};

use crate::error::AdapterError;

/// Limit used when `retrieve` is called without one.
pub const DEFAULT_RETRIEVE_LIMIT: usize = 10;

/// A retrieval hit in the host's shape.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub document_id: String,
    pub document: Document,
    pub score: f32,
    pub metadata: Metadata,
}

/// Keyword retrieval backend.
///
/// # Example
///
/// ```rust
/// use kwstore_adapters::{KeywordSearch, KeywordStore, StoreOptions};
/// use kwstore_types::{ConfigOverrides, Document};
///
/// let options = StoreOptions::new()
///     .without_env()
///     .with_overrides(ConfigOverrides::new().tokenizer("simple"));
/// let mut store = KeywordStore::new(options).unwrap();
/// store
///     .index_document(Document::new("doc1", "Python programming language"))
///     .unwrap();
///
/// let hits = store.retrieve("python", None, None).unwrap();
/// assert_eq!(hits[0].document_id, "doc1");
/// ```
pub trait KeywordSearch {
    /// Ranked hits for `query`, at most `limit` (default 10), optionally
    /// restricted by a metadata filter.
    fn retrieve(
        &self,
        query: &str,
        limit: Option<usize>,
        metadata_filter: Option<&Metadata>,
    ) -> Result<Vec<SearchHit>, AdapterError>;

    fn index_documents(&mut self, documents: Vec<Document>) -> Result<(), AdapterError>;

    fn index_document(&mut self, document: Document) -> Result<(), AdapterError> {
        self.index_documents(vec![document])
    }

    /// `false` when no document has this id.
    fn remove_document(&mut self, document_id: &str) -> Result<bool, AdapterError>;

    /// `false` when no document has the given document's id.
    fn update_document(&mut self, document: Document) -> Result<bool, AdapterError>;

    fn get_document_count(&self) -> usize;

    fn clear_index(&mut self) -> Result<(), AdapterError>;

    fn add_document(&mut self, document: Document) -> Result<(), AdapterError> {
        self.index_document(document)
    }

    fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>, AdapterError> {
        self.retrieve(query, Some(limit), None)
    }
}

/// Pipeline stage that consumes documents and passes them on.
pub trait DocumentProcessor {
    fn process(&mut self, documents: Vec<Document>) -> Result<Vec<Document>, AdapterError>;
}
