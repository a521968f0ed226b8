//! # kwstore-types
//!
//! Shared domain types for the BM25 keyword store.
//!
//! - [`Document`]: the unit of indexing (id, content, metadata)
//! - [`Bm25Config`]: validated ranking and analysis settings
//! - [`resolve_config`]: layered configuration precedence
//!
//! ## Usage
//!
//! ```rust
//! use kwstore_types::{Bm25Config, ConfigOverrides, Document};
//!
//! let config = Bm25Config::from_overrides(&ConfigOverrides::new().k1(1.5)).unwrap();
//! assert_eq!(config.k1, 1.5);
//!
//! let doc = Document::new("doc1", "Python programming language");
//! assert!(doc.validate());
//! ```

pub mod config;
pub mod document;
pub mod error;

pub use config::{
    resolve_config, Bm25Config, ConfigOverrides, EnvSource, ScoringMethod, TokenizerKind,
    DEFAULT_B, DEFAULT_EPSILON, DEFAULT_K1, ENV_PREFIX,
};
pub use document::{Document, Metadata};
pub use error::ConfigError;
