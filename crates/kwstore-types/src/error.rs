//! Error types for configuration handling.

use thiserror::Error;

/// Errors raised while assembling or validating a [`Bm25Config`](crate::Bm25Config).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Numeric parameter outside its allowed range
    #[error("{field} out of range: {value} (expected {expected})")]
    OutOfRange {
        field: &'static str,
        value: f64,
        expected: &'static str,
    },

    /// Unrecognized enumerated value (method, tokenizer)
    #[error("Invalid {field}: {value}")]
    Invalid { field: &'static str, value: String },

    /// Layered source could not be read or deserialized
    #[error("Configuration error: {0}")]
    Load(String),
}

impl ConfigError {
    pub fn invalid(field: &'static str, value: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            value: value.into(),
        }
    }
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::Load(err.to_string())
    }
}
