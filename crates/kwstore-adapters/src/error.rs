//! Error types for adapter operations.

use kwstore_search::SearchError;
use kwstore_types::ConfigError;
use thiserror::Error;

/// Errors surfaced to the host.
#[derive(Error, Debug)]
pub enum AdapterError {
    /// Configuration could not be resolved or validated.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Index or search failure.
    #[error(transparent)]
    Search(#[from] SearchError),

    /// Arguments do not fit together (e.g. texts and metadatas of different lengths).
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl AdapterError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }
}
