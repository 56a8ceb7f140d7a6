//! Content hashing over canonical forms.

use crate::canonical::{canonicalize, AttestationMode, CanonicalForm, Canonicalize};
use crate::crypto::Sha256Hash;
use crate::error::CanonicalizationError;

/// A canonical form together with its SHA-256 digest.
///
/// The canonical string is kept for hash-mismatch triage across
/// implementations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashedRecord {
    pub canonical: CanonicalForm,
    pub digest: Sha256Hash,
}

impl HashedRecord {
    /// Lowercase hex of the digest.
    pub fn digest_hex(&self) -> String {
        self.digest.to_hex()
    }
}

/// Digest an already-canonical form.
pub fn hash_canonical(canonical: CanonicalForm) -> HashedRecord {
    let digest = Sha256Hash::hash(canonical.as_bytes());
    HashedRecord { canonical, digest }
}

/// Canonicalize and digest in one step.
pub fn hash_record<T: Canonicalize + ?Sized>(
    value: &T,
    mode: AttestationMode,
) -> Result<HashedRecord, CanonicalizationError> {
    canonicalize(value, mode).map(hash_canonical)
}
