//! Error types for the store module.

use thiserror::Error;

/// Errors that can occur during store operations.
///
/// These are infrastructure failures. A record that fails to chain is not a
/// store error; it is reported through [`crate::AppendResult`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// Backend failure reported by an external storage collaborator.
    #[error("backend error: {0}")]
    Backend(String),

    /// Serialization/deserialization of a stored entry failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Invalid data in storage.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// A lock guarding in-memory state was poisoned by a panicking writer.
    #[error("store lock poisoned")]
    Poisoned,
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
