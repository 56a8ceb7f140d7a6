//! Kernel configuration.

use std::time::Duration;

use cep_kernel_attest::AttestationPolicy;
use cep_kernel_core::AttestationMode;
use cep_kernel_registry::{IdentifierMode, VocabularyMode};

/// Which canonical form `previousRecordHash` commits to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ChainHashMode {
    /// Digest of the predecessor including its attestation block.
    #[default]
    IncludeAttestation,
    /// Digest of the predecessor's signed (attestation-excluded) form.
    ExcludeAttestation,
}

impl ChainHashMode {
    pub fn attestation_mode(&self) -> AttestationMode {
        match self {
            Self::IncludeAttestation => AttestationMode::Include,
            Self::ExcludeAttestation => AttestationMode::Exclude,
        }
    }
}

/// Configuration for the Kernel.
#[derive(Debug, Clone)]
pub struct KernelConfig {
    /// Signature policy: expected purposes and clock skew.
    pub attestation: AttestationPolicy,
    /// Digest that links a revision to its predecessor.
    pub chain_hash_mode: ChainHashMode,
    /// Treatment of unknown additional identifier schemes.
    pub identifier_mode: IdentifierMode,
    /// Treatment of type and role URIs outside their vocabularies.
    pub vocabulary_mode: VocabularyMode,
    /// Whether every referenced entity id must already be admitted.
    pub enforce_entity_references: bool,
    /// Bound on key resolution; elapsed lookups yield PENDING.
    pub key_resolution_timeout: Option<Duration>,
    /// Compare-and-swap attempts before a commit gives up.
    pub max_commit_attempts: usize,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            attestation: AttestationPolicy::default(),
            chain_hash_mode: ChainHashMode::default(),
            identifier_mode: IdentifierMode::default(),
            vocabulary_mode: VocabularyMode::default(),
            enforce_entity_references: true,
            key_resolution_timeout: Some(Duration::from_secs(10)),
            max_commit_attempts: 3,
        }
    }
}
