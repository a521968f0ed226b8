//! # kwstore-search
//!
//! BM25 keyword indexing and search using Tantivy.
//!
//! ## Features
//! - In-RAM Tantivy index rebuilt from the full corpus on every mutation
//! - Lucene, Robertson, ATIRE, BM25L and BM25+ scoring with configurable k1/b
//! - Japanese morphological tokenization via lindera (feature `japanese`)
//! - Metadata filters evaluated natively when possible, post-filtered otherwise
//! - JSON snapshots for save/load
//!
//! ## Usage
//!
//! ```rust
//! use kwstore_search::{IndexService, SearchService};
//! use kwstore_types::{Bm25Config, ConfigOverrides, Document};
//!
//! let config = Bm25Config::from_overrides(&ConfigOverrides::new().tokenizer("simple")).unwrap();
//! let mut index = IndexService::new(config).unwrap();
//! index
//!     .create_index(vec![
//!         Document::new("doc1", "Python programming language"),
//!         Document::new("doc2", "Machine learning with Python"),
//!     ])
//!     .unwrap();
//!
//! let results = SearchService::new(&index).search("python", 10, None).unwrap();
//! assert_eq!(results.len(), 2);
//! ```

pub mod engine;
pub mod error;
pub mod filter;
pub mod index;
pub mod indexer;
pub mod schema;
pub mod scoring;
pub mod searcher;
pub mod snapshot;
pub mod tokenizer;

pub use engine::{EngineBuilder, EngineCapabilities, EngineHandle, RankingEngine, ScoredDoc};
pub use error::SearchError;
pub use filter::{Criterion, MetadataFilter, Operator};
pub use index::{TantivyEngine, TantivyEngineBuilder};
pub use indexer::IndexService;
pub use schema::{build_keyword_schema, KeywordSchema};
pub use scoring::{Bm25Scorer, CorpusStats};
pub use searcher::{SearchResult, SearchService};
pub use snapshot::{IndexSnapshot, SNAPSHOT_FORMAT_VERSION};
pub use tokenizer::{build_analyzer, Analyzer, SegmentationFailures};
