//! Error types for vocabulary and identifier registries.

use thiserror::Error;

/// Failures of the vocabulary cache and identifier registry collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The cache was used before its first successful load.
    #[error("vocabulary cache not loaded")]
    NotLoaded,

    /// The vocabulary source failed.
    #[error("vocabulary source error: {0}")]
    Source(String),

    /// A vocabulary document breaks its own invariants.
    #[error("invalid vocabulary {uri}: {reason}")]
    InvalidVocabulary { uri: String, reason: String },

    /// Unknown vocabulary name.
    #[error("unknown vocabulary name: {0}")]
    UnknownVocabulary(String),

    /// An identifier registry could not answer.
    #[error("identifier registry unavailable: {0}")]
    Unavailable(String),

    #[error("vocabulary parse error: {0}")]
    Parse(String),
}

impl From<serde_json::Error> for RegistryError {
    fn from(err: serde_json::Error) -> Self {
        RegistryError::Parse(err.to_string())
    }
}

/// Result type for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;
