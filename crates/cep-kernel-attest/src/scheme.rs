//! Signature schemes keyed by `proofType`.
//!
//! Every scheme verifies a signature over the raw 32-byte record digest.
//! Ed25519 signs those bytes directly; ECDSA-P256 and RSA-PSS hash them
//! once more with SHA-256 as their message digest.
//!
//! | proofType | key bytes | signature bytes |
//! |-----------|-----------|-----------------|
//! | `Ed25519Signature2020` | 32-byte public key | 64 bytes |
//! | `EcdsaSecp256r1Signature2019` | SEC1 point (compressed or not) | 64-byte `r ‖ s` |
//! | `RsaPssSignature2018` | SPKI or PKCS#1 DER | modulus-sized |

use std::collections::HashMap;
use std::sync::Arc;

use p256::ecdsa::signature::Verifier as _;
use rsa::pkcs1::DecodeRsaPublicKey;
use rsa::pkcs8::DecodePublicKey;
use rsa::RsaPublicKey;
use sha2::Sha256;

use cep_kernel_core::{Ed25519PublicKey, Ed25519Signature, ProofAlgorithm};

use crate::error::SchemeError;

/// Verifies raw signatures for one algorithm.
pub trait SignatureScheme: Send + Sync {
    fn algorithm(&self) -> ProofAlgorithm;

    /// Verify `signature` over `message` with the raw public `key`.
    fn verify(&self, key: &[u8], message: &[u8], signature: &[u8]) -> Result<(), SchemeError>;
}

/// Ed25519 (`Ed25519Signature2020`).
#[derive(Debug, Clone, Copy, Default)]
pub struct Ed25519Scheme;

impl SignatureScheme for Ed25519Scheme {
    fn algorithm(&self) -> ProofAlgorithm {
        ProofAlgorithm::Ed25519
    }

    fn verify(&self, key: &[u8], message: &[u8], signature: &[u8]) -> Result<(), SchemeError> {
        let key = Ed25519PublicKey::from_slice(key)
            .map_err(|e| SchemeError::MalformedKey(e.to_string()))?;
        let signature = Ed25519Signature::from_slice(signature)
            .map_err(|e| SchemeError::MalformedSignature(e.to_string()))?;
        key.verify(message, &signature).map_err(|_| SchemeError::Invalid)
    }
}

/// ECDSA over NIST P-256 with SHA-256 (`EcdsaSecp256r1Signature2019`).
#[derive(Debug, Clone, Copy, Default)]
pub struct EcdsaP256Scheme;

impl SignatureScheme for EcdsaP256Scheme {
    fn algorithm(&self) -> ProofAlgorithm {
        ProofAlgorithm::EcdsaP256
    }

    fn verify(&self, key: &[u8], message: &[u8], signature: &[u8]) -> Result<(), SchemeError> {
        let key = p256::ecdsa::VerifyingKey::from_sec1_bytes(key)
            .map_err(|e| SchemeError::MalformedKey(e.to_string()))?;
        let signature = p256::ecdsa::Signature::from_slice(signature)
            .map_err(|e| SchemeError::MalformedSignature(e.to_string()))?;
        key.verify(message, &signature).map_err(|_| SchemeError::Invalid)
    }
}

/// RSASSA-PSS with SHA-256 and MGF1-SHA-256 (`RsaPssSignature2018`).
#[derive(Debug, Clone, Copy, Default)]
pub struct RsaPssScheme;

impl RsaPssScheme {
    fn public_key(key: &[u8]) -> Result<RsaPublicKey, SchemeError> {
        RsaPublicKey::from_public_key_der(key)
            .or_else(|_| RsaPublicKey::from_pkcs1_der(key))
            .map_err(|e| SchemeError::MalformedKey(e.to_string()))
    }
}

impl SignatureScheme for RsaPssScheme {
    fn algorithm(&self) -> ProofAlgorithm {
        ProofAlgorithm::RsaPss
    }

    fn verify(&self, key: &[u8], message: &[u8], signature: &[u8]) -> Result<(), SchemeError> {
        let key = rsa::pss::VerifyingKey::<Sha256>::new(Self::public_key(key)?);
        let signature = rsa::pss::Signature::try_from(signature)
            .map_err(|e| SchemeError::MalformedSignature(e.to_string()))?;
        key.verify(message, &signature).map_err(|_| SchemeError::Invalid)
    }
}

/// The set of schemes a verifier accepts.
#[derive(Clone)]
pub struct SchemeRegistry {
    schemes: HashMap<ProofAlgorithm, Arc<dyn SignatureScheme>>,
}

impl SchemeRegistry {
    /// A registry with no schemes.
    pub fn empty() -> Self {
        Self {
            schemes: HashMap::new(),
        }
    }

    /// Register (or replace) the scheme for its algorithm.
    pub fn register(mut self, scheme: impl SignatureScheme + 'static) -> Self {
        self.schemes.insert(scheme.algorithm(), Arc::new(scheme));
        self
    }

    pub fn get(&self, algorithm: &ProofAlgorithm) -> Option<&Arc<dyn SignatureScheme>> {
        self.schemes.get(algorithm)
    }

    pub fn supports(&self, algorithm: &ProofAlgorithm) -> bool {
        self.schemes.contains_key(algorithm)
    }
}

impl Default for SchemeRegistry {
    /// Ed25519, ECDSA-P256 and RSA-PSS.
    fn default() -> Self {
        Self::empty()
            .register(Ed25519Scheme)
            .register(EcdsaP256Scheme)
            .register(RsaPssScheme)
    }
}

impl std::fmt::Debug for SchemeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut algorithms: Vec<_> = self.schemes.keys().map(ProofAlgorithm::as_str).collect();
        algorithms.sort_unstable();
        f.debug_struct("SchemeRegistry")
            .field("algorithms", &algorithms)
            .finish()
    }
}
