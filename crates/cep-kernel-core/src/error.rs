//! Error types for the CEP kernel core.
//!
//! [`VerificationError`] is the full rejection taxonomy. Every variant is
//! terminal for the single record it was raised for and maps to a stable
//! [`RejectCode`] that storage layers and peers can compare across
//! implementations.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::crypto::Sha256Hash;

/// Errors raised while producing a canonical form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CanonicalizationError {
    #[error("non-finite value in field {field}")]
    NonFinite { field: String },

    #[error("value out of range for field {field}: {value}")]
    OutOfRange { field: String, value: String },
}

/// Errors raised by key and signature handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    #[error("invalid public key")]
    InvalidPublicKey,

    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid length: expected {expected} bytes, got {got}")]
    InvalidLength { expected: usize, got: usize },

    #[error("invalid encoding: {0}")]
    InvalidEncoding(String),
}

/// Stable reason codes carried by a rejected verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RejectCode {
    Canonicalization,
    KeyResolution,
    SignatureMismatch,
    AttestationPolicy,
    RevisionSequence,
    HashMismatch,
    CyclicProvenance,
    ReferentialIntegrity,
    UnknownIdentifierScheme,
    InvalidIdentifier,
    DuplicateIdentifier,
    FundingChainTagMismatch,
    Structural,
}

impl RejectCode {
    /// The wire form of the code.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Canonicalization => "CANONICALIZATION",
            Self::KeyResolution => "KEY_RESOLUTION",
            Self::SignatureMismatch => "SIGNATURE_MISMATCH",
            Self::AttestationPolicy => "ATTESTATION_POLICY",
            Self::RevisionSequence => "REVISION_SEQUENCE",
            Self::HashMismatch => "HASH_MISMATCH",
            Self::CyclicProvenance => "CYCLIC_PROVENANCE",
            Self::ReferentialIntegrity => "REFERENTIAL_INTEGRITY",
            Self::UnknownIdentifierScheme => "UNKNOWN_IDENTIFIER_SCHEME",
            Self::InvalidIdentifier => "INVALID_IDENTIFIER",
            Self::DuplicateIdentifier => "DUPLICATE_IDENTIFIER",
            Self::FundingChainTagMismatch => "FUNDING_CHAIN_TAG_MISMATCH",
            Self::Structural => "STRUCTURAL",
        }
    }
}

impl fmt::Display for RejectCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A verification-path failure for a single record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerificationError {
    #[error("canonicalization failed: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    #[error("key resolution failed for {uri}: {reason}")]
    KeyResolution { uri: String, reason: String },

    #[error("signature mismatch: {0}")]
    SignatureMismatch(String),

    #[error("attestation policy violated: {0}")]
    AttestationPolicy(String),

    #[error("revision sequence error for {logical_id}: expected revision {expected}, got {got}")]
    RevisionSequence {
        logical_id: String,
        expected: u64,
        got: u64,
    },

    #[error("previous record hash mismatch for {logical_id}: expected {expected:?}, got {got:?}")]
    HashMismatch {
        logical_id: String,
        expected: Option<Sha256Hash>,
        got: Option<Sha256Hash>,
    },

    #[error("cyclic provenance at {logical_id}: {}", path.join(" -> "))]
    CyclicProvenance { logical_id: String, path: Vec<String> },

    #[error("{logical_id} references unknown {field} {missing}")]
    ReferentialIntegrity {
        logical_id: String,
        field: &'static str,
        missing: String,
    },

    #[error("unknown identifier scheme: {0}")]
    UnknownIdentifierScheme(String),

    #[error("invalid {scheme} identifier: {value:?}")]
    InvalidIdentifier { scheme: String, value: String },

    #[error("duplicate identifier {scheme}={value}")]
    DuplicateIdentifier { scheme: String, value: String },

    /// A controlled field names a term outside its vocabulary.
    #[error("{field} {term_uri} is not a {vocabulary} term")]
    UnknownVocabularyTerm {
        vocabulary: String,
        field: String,
        term_uri: String,
    },

    #[error("funding chain tag mismatch: declared {declared}, derived {derived}")]
    FundingChainTagMismatch { declared: String, derived: String },

    #[error("structural error: {0}")]
    Structural(String),
}

impl VerificationError {
    /// The reason code reported in a rejected verdict.
    pub fn code(&self) -> RejectCode {
        match self {
            Self::Canonicalization(_) => RejectCode::Canonicalization,
            Self::KeyResolution { .. } => RejectCode::KeyResolution,
            Self::SignatureMismatch(_) => RejectCode::SignatureMismatch,
            Self::AttestationPolicy(_) => RejectCode::AttestationPolicy,
            Self::RevisionSequence { .. } => RejectCode::RevisionSequence,
            Self::HashMismatch { .. } => RejectCode::HashMismatch,
            Self::CyclicProvenance { .. } => RejectCode::CyclicProvenance,
            Self::ReferentialIntegrity { .. } => RejectCode::ReferentialIntegrity,
            Self::UnknownIdentifierScheme(_) => RejectCode::UnknownIdentifierScheme,
            Self::InvalidIdentifier { .. } => RejectCode::InvalidIdentifier,
            Self::DuplicateIdentifier { .. } => RejectCode::DuplicateIdentifier,
            Self::FundingChainTagMismatch { .. } => RejectCode::FundingChainTagMismatch,
            Self::UnknownVocabularyTerm { .. } | Self::Structural(_) => RejectCode::Structural,
        }
    }

    /// Whether the same record may succeed later without being changed.
    ///
    /// Chain rejections clear once the true predecessor has been accepted;
    /// dangling references clear once the referenced record is admitted.
    pub fn is_resubmittable(&self) -> bool {
        matches!(
            self,
            Self::RevisionSequence { .. }
                | Self::HashMismatch { .. }
                | Self::ReferentialIntegrity { .. }
                | Self::KeyResolution { .. }
        )
    }
}
