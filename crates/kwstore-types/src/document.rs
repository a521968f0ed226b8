//! Indexable document type.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Free-form document metadata.
pub type Metadata = serde_json::Map<String, Value>;

/// A document as stored in the keyword index.
///
/// The same type is used on both sides of the adapter: callers hand documents
/// in, search results hand clones back out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Caller-assigned identifier, unique within one index
    pub id: String,

    /// Text that is tokenized and scored
    pub content: String,

    /// Metadata used for post-hoc filtering
    #[serde(default)]
    pub metadata: Metadata,
}

impl Document {
    /// Create a document with empty metadata.
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            metadata: Metadata::new(),
        }
    }

    /// Add a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Replace the metadata map.
    pub fn with_metadata_map(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// A document is indexable when both id and content are non-blank.
    pub fn validate(&self) -> bool {
        !self.id.trim().is_empty() && !self.content.trim().is_empty()
    }
}
