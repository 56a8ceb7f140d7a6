//! Error types for attestation verification.

use thiserror::Error;

use cep_kernel_core::VerificationError;

/// Failure of the key-resolution collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyResolutionError {
    /// No key is published at the verification method URI.
    #[error("no key published at {0}")]
    NotFound(String),

    /// The key source could not be reached.
    #[error("key source for {uri} unreachable: {reason}")]
    Unreachable { uri: String, reason: String },

    /// The published key material is unusable.
    #[error("invalid key material at {uri}: {reason}")]
    InvalidKey { uri: String, reason: String },
}

impl KeyResolutionError {
    pub fn uri(&self) -> &str {
        match self {
            Self::NotFound(uri) => uri,
            Self::Unreachable { uri, .. } | Self::InvalidKey { uri, .. } => uri,
        }
    }
}

impl From<KeyResolutionError> for VerificationError {
    fn from(err: KeyResolutionError) -> Self {
        VerificationError::KeyResolution {
            uri: err.uri().to_string(),
            reason: err.to_string(),
        }
    }
}

/// Failure inside a signature scheme.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemeError {
    #[error("malformed key: {0}")]
    MalformedKey(String),

    #[error("malformed signature: {0}")]
    MalformedSignature(String),

    #[error("signature does not verify")]
    Invalid,
}

/// Result type for key resolution.
pub type Result<T> = std::result::Result<T, KeyResolutionError>;
