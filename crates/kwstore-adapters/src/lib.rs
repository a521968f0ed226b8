//! # kwstore-adapters
//!
//! Host-facing surfaces for the BM25 keyword store.
//!
//! - [`KeywordStore`]: implements [`KeywordSearch`] and [`DocumentProcessor`]
//! - [`VectorStore`]: the same index behind `add_texts` / `similarity_search`
//! - [`StoreOptions`]: overrides, environment and legacy configuration inputs

pub mod adapter;
pub mod config;
pub mod error;
pub mod keyword_store;
pub mod vector_store;

pub use adapter::{DocumentProcessor, KeywordSearch, SearchHit, DEFAULT_RETRIEVE_LIMIT};
pub use config::StoreOptions;
pub use error::AdapterError;
pub use keyword_store::KeywordStore;
pub use vector_store::{PageDocument, VectorStore, DEFAULT_K};
