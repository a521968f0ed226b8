//! Index service: the authoritative document list plus its ranking engine.
//!
//! Every mutation copies the list, applies the change, and rebuilds the
//! engine from scratch. State is only replaced after a successful build, so
//! the list and the engine always describe the same corpus.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use kwstore_types::{Bm25Config, Document};
use tracing::{debug, info};

use crate::engine::{EngineBuilder, EngineHandle};
use crate::error::SearchError;
use crate::index::TantivyEngineBuilder;
use crate::snapshot::IndexSnapshot;

/// Owns the corpus and the engine built over it.
pub struct IndexService {
    config: Bm25Config,
    builder: Box<dyn EngineBuilder>,
    documents: Vec<Document>,
    handle: Option<EngineHandle>,
}

impl IndexService {
    /// Create a service with the Tantivy engine.
    pub fn new(config: Bm25Config) -> Result<Self, SearchError> {
        config.validate()?;
        let builder = TantivyEngineBuilder::new(&config)?;
        Ok(Self::with_builder(config, Box::new(builder)))
    }

    /// Create a service with a custom engine builder.
    pub fn with_builder(config: Bm25Config, builder: Box<dyn EngineBuilder>) -> Self {
        Self {
            config,
            builder,
            documents: Vec::new(),
            handle: None,
        }
    }

    pub fn config(&self) -> &Bm25Config {
        &self.config
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn document_count(&self) -> usize {
        self.documents.len()
    }

    pub fn get_document(&self, id: &str) -> Option<&Document> {
        self.documents.iter().find(|d| d.id == id)
    }

    /// The current engine, if any document is indexed.
    pub fn handle(&self) -> Option<&EngineHandle> {
        self.handle.as_ref()
    }

    pub fn is_indexed(&self) -> bool {
        self.handle.is_some()
    }

    /// Replace the corpus with `documents`.
    ///
    /// Invalid documents are dropped; fails with [`SearchError::EmptyCorpus`]
    /// if none remain.
    pub fn create_index(&mut self, documents: Vec<Document>) -> Result<usize, SearchError> {
        let corpus = upsert_all(Vec::new(), valid_documents(documents));
        if corpus.is_empty() {
            return Err(SearchError::EmptyCorpus);
        }
        self.rebuild(corpus)
    }

    /// Add documents, replacing any with the same id in place.
    ///
    /// Returns how many valid documents were accepted.
    pub fn add_documents(&mut self, documents: Vec<Document>) -> Result<usize, SearchError> {
        let incoming = valid_documents(documents);
        if incoming.is_empty() {
            return Ok(0);
        }
        let accepted = incoming.len();
        let corpus = upsert_all(self.documents.clone(), incoming);
        self.rebuild(corpus)?;
        Ok(accepted)
    }

    /// Replace an existing document. `false` if the id is unknown or the
    /// document is invalid.
    pub fn update_document(&mut self, document: Document) -> Result<bool, SearchError> {
        if !document.validate() {
            debug!(id = %document.id, "Dropped invalid document update");
            return Ok(false);
        }
        let Some(position) = self.documents.iter().position(|d| d.id == document.id) else {
            return Ok(false);
        };

        let mut corpus = self.documents.clone();
        corpus[position] = document;
        self.rebuild(corpus)?;
        Ok(true)
    }

    /// Remove one document. `false` if the id is unknown.
    pub fn remove_document(&mut self, id: &str) -> Result<bool, SearchError> {
        Ok(self.remove_documents(&[id])? > 0)
    }

    /// Remove every document whose id is listed. Returns the number removed.
    pub fn remove_documents<S: AsRef<str>>(&mut self, ids: &[S]) -> Result<usize, SearchError> {
        let corpus: Vec<Document> = self
            .documents
            .iter()
            .filter(|d| !ids.iter().any(|id| id.as_ref() == d.id))
            .cloned()
            .collect();

        let removed = self.documents.len() - corpus.len();
        if removed > 0 {
            self.rebuild(corpus)?;
        }
        Ok(removed)
    }

    /// Drop every document and the engine.
    pub fn clear(&mut self) {
        self.documents.clear();
        self.handle = None;
        debug!("Cleared keyword index");
    }

    /// Save to the configured `index_path`.
    pub fn save_index(&self) -> Result<PathBuf, SearchError> {
        let path = self
            .config
            .index_path()
            .ok_or(SearchError::IndexPathNotConfigured)?
            .to_path_buf();
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), SearchError> {
        if self.handle.is_none() {
            return Err(SearchError::IndexNotAvailable);
        }
        IndexSnapshot::new(self.config.clone(), self.documents.clone()).write(path)?;
        info!(path = ?path, docs = self.documents.len(), "Saved keyword index");
        Ok(())
    }

    /// Load from the configured `index_path`, replacing the current corpus.
    pub fn load_index(&mut self) -> Result<usize, SearchError> {
        let path = self
            .config
            .index_path()
            .ok_or(SearchError::IndexPathNotConfigured)?
            .to_path_buf();
        self.load_from(&path)
    }

    /// Load a snapshot and rebuild the engine with the current configuration.
    pub fn load_from(&mut self, path: &Path) -> Result<usize, SearchError> {
        let snapshot = IndexSnapshot::read(path)?;
        if snapshot.config != self.config {
            debug!(path = ?path, "Snapshot was written with a different configuration");
        }

        let corpus = upsert_all(Vec::new(), valid_documents(snapshot.documents));
        let count = self.rebuild(corpus)?;
        info!(path = ?path, docs = count, "Loaded keyword index");
        Ok(count)
    }

    fn rebuild(&mut self, corpus: Vec<Document>) -> Result<usize, SearchError> {
        if corpus.is_empty() {
            self.clear();
            return Ok(0);
        }

        let engine = self.builder.build(&self.config, &corpus)?;
        let handle = EngineHandle::new(engine);
        debug!(
            docs = corpus.len(),
            native_filter = handle.capabilities().native_filter,
            "Rebuilt ranking engine"
        );

        self.documents = corpus;
        self.handle = Some(handle);
        Ok(self.documents.len())
    }
}

impl std::fmt::Debug for IndexService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexService")
            .field("config", &self.config)
            .field("documents", &self.documents.len())
            .field("handle", &self.handle)
            .finish()
    }
}

fn valid_documents(documents: Vec<Document>) -> Vec<Document> {
    documents
        .into_iter()
        .filter(|d| {
            let valid = d.validate();
            if !valid {
                debug!(id = %d.id, "Dropped invalid document");
            }
            valid
        })
        .collect()
}

/// Append `incoming` to `corpus`; an existing id is replaced in place.
fn upsert_all(mut corpus: Vec<Document>, incoming: Vec<Document>) -> Vec<Document> {
    let mut positions: HashMap<String, usize> = corpus
        .iter()
        .enumerate()
        .map(|(i, d)| (d.id.clone(), i))
        .collect();

    for document in incoming {
        match positions.get(&document.id) {
            Some(&i) => corpus[i] = document,
            None => {
                positions.insert(document.id.clone(), corpus.len());
                corpus.push(document);
            }
        }
    }
    corpus
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::RankingEngine;
    use kwstore_types::ConfigOverrides;
    use tempfile::TempDir;

    fn config(index_path: Option<&Path>) -> Bm25Config {
        let mut overrides = ConfigOverrides::new().tokenizer("simple");
        if let Some(path) = index_path {
            overrides = overrides.index_path(path.to_string_lossy());
        }
        Bm25Config::from_overrides(&overrides).unwrap()
    }

    fn service() -> IndexService {
        IndexService::new(config(None)).unwrap()
    }

    fn docs() -> Vec<Document> {
        vec![
            Document::new("doc1", "Python programming language"),
            Document::new("doc2", "Machine learning with Python"),
            Document::new("doc3", "Rust systems programming"),
        ]
    }

    fn ids(service: &IndexService) -> Vec<&str> {
        service.documents().iter().map(|d| d.id.as_str()).collect()
    }

    /// Fails to build whenever a document contains "explode".
    struct FragileBuilder {
        inner: TantivyEngineBuilder,
    }

    impl EngineBuilder for FragileBuilder {
        fn build(
            &self,
            config: &Bm25Config,
            documents: &[Document],
        ) -> Result<Box<dyn RankingEngine>, SearchError> {
            if documents.iter().any(|d| d.content.contains("explode")) {
                return Err(SearchError::analyzer("boom"));
            }
            self.inner.build(config, documents)
        }
    }

    #[test]
    fn test_create_index() {
        let mut service = service();
        assert!(!service.is_indexed());
        assert_eq!(service.create_index(docs()).unwrap(), 3);
        assert!(service.is_indexed());
        assert_eq!(service.handle().unwrap().engine().num_docs(), 3);
    }

    #[test]
    fn test_create_index_empty_corpus() {
        let mut service = service();
        assert!(matches!(service.create_index(vec![]), Err(SearchError::EmptyCorpus)));
        assert!(matches!(
            service.create_index(vec![Document::new("", "content"), Document::new("x", "  ")]),
            Err(SearchError::EmptyCorpus)
        ));
    }

    #[test]
    fn test_invalid_documents_dropped() {
        let mut service = service();
        let mut input = docs();
        input.push(Document::new("", "no id"));
        input.push(Document::new("doc9", ""));
        assert_eq!(service.create_index(input).unwrap(), 3);
        assert_eq!(service.add_documents(vec![Document::new(" ", "x")]).unwrap(), 0);
        assert_eq!(service.document_count(), 3);
    }

    #[test]
    fn test_add_documents_upserts() {
        let mut service = service();
        service.create_index(docs()).unwrap();

        let added = service
            .add_documents(vec![
                Document::new("doc4", "Go concurrency"),
                Document::new("doc2", "Deep learning with Python"),
            ])
            .unwrap();
        assert_eq!(added, 2);
        assert_eq!(ids(&service), vec!["doc1", "doc2", "doc3", "doc4"]);
        assert_eq!(
            service.get_document("doc2").unwrap().content,
            "Deep learning with Python"
        );
        assert_eq!(service.handle().unwrap().engine().num_docs(), 4);
    }

    #[test]
    fn test_add_to_empty_service() {
        let mut service = service();
        assert_eq!(service.add_documents(docs()).unwrap(), 3);
        assert!(service.is_indexed());
    }

    #[test]
    fn test_update_document() {
        let mut service = service();
        service.create_index(docs()).unwrap();

        assert!(service
            .update_document(Document::new("doc1", "Updated content").with_metadata("v", 2))
            .unwrap());
        assert_eq!(ids(&service), vec!["doc1", "doc2", "doc3"]);
        assert_eq!(service.get_document("doc1").unwrap().content, "Updated content");

        assert!(!service.update_document(Document::new("nope", "x")).unwrap());
        assert!(!service.update_document(Document::new("doc1", "")).unwrap());
    }

    #[test]
    fn test_remove_document() {
        let mut service = service();
        service.create_index(docs()).unwrap();

        assert!(service.remove_document("doc2").unwrap());
        assert_eq!(ids(&service), vec!["doc1", "doc3"]);
        assert_eq!(service.handle().unwrap().engine().num_docs(), 2);

        assert!(!service.remove_document("doc2").unwrap());
        assert_eq!(service.document_count(), 2);
    }

    #[test]
    fn test_remove_last_document_clears() {
        let mut service = service();
        service.create_index(vec![Document::new("only", "single document")]).unwrap();
        assert!(service.remove_document("only").unwrap());
        assert_eq!(service.document_count(), 0);
        assert!(!service.is_indexed());
    }

    #[test]
    fn test_remove_documents() {
        let mut service = service();
        service.create_index(docs()).unwrap();
        assert_eq!(service.remove_documents(&["doc1", "doc3", "missing"]).unwrap(), 2);
        assert_eq!(ids(&service), vec!["doc2"]);
    }

    #[test]
    fn test_clear() {
        let mut service = service();
        service.create_index(docs()).unwrap();
        service.clear();
        assert_eq!(service.document_count(), 0);
        assert!(service.handle().is_none());
    }

    #[test]
    fn test_failed_rebuild_keeps_state() {
        let config = config(None);
        let builder = FragileBuilder {
            inner: TantivyEngineBuilder::new(&config).unwrap(),
        };
        let mut service = IndexService::with_builder(config, Box::new(builder));
        service.create_index(docs()).unwrap();

        assert!(service
            .add_documents(vec![Document::new("doc4", "explode")])
            .is_err());
        assert_eq!(ids(&service), vec!["doc1", "doc2", "doc3"]);
        assert_eq!(service.handle().unwrap().engine().num_docs(), 3);

        assert!(service
            .update_document(Document::new("doc1", "explode"))
            .is_err());
        assert_eq!(
            service.get_document("doc1").unwrap().content,
            "Python programming language"
        );
    }

    #[test]
    fn test_save_requires_path_and_index() {
        let service = service();
        assert!(matches!(
            service.save_index(),
            Err(SearchError::IndexPathNotConfigured)
        ));

        let temp_dir = TempDir::new().unwrap();
        let service = IndexService::new(config(Some(&temp_dir.path().join("i.json")))).unwrap();
        assert!(matches!(service.save_index(), Err(SearchError::IndexNotAvailable)));
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("index.json");

        let mut service = IndexService::new(config(Some(&path))).unwrap();
        service.create_index(docs()).unwrap();
        assert_eq!(service.save_index().unwrap(), path);

        let mut restored = IndexService::new(config(Some(&path))).unwrap();
        assert_eq!(restored.load_index().unwrap(), 3);
        assert_eq!(restored.documents(), service.documents());
        assert!(restored.is_indexed());
    }

    #[test]
    fn test_load_errors() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("missing.json");
        let mut service = IndexService::new(config(Some(&path))).unwrap();
        assert!(matches!(service.load_index(), Err(SearchError::IndexNotFound(_))));

        std::fs::write(&path, "{broken").unwrap();
        assert!(matches!(service.load_index(), Err(SearchError::Snapshot(_))));

        let mut no_path = IndexService::new(config(None)).unwrap();
        assert!(matches!(
            no_path.load_index(),
            Err(SearchError::IndexPathNotConfigured)
        ));
    }

    #[test]
    fn test_upsert_all_within_batch() {
        let corpus = upsert_all(
            Vec::new(),
            vec![
                Document::new("a", "first"),
                Document::new("b", "second"),
                Document::new("a", "third"),
            ],
        );
        assert_eq!(corpus.len(), 2);
        assert_eq!(corpus[0].content, "third");
    }
}
