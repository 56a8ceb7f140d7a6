//! Attestation blocks and proof vocabularies.
//!
//! An attestation binds an attestor to the attestation-excluded canonical
//! form of the record that carries it. The signed message is the 32-byte
//! SHA-256 digest of that form.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::canonical::{CanonicalObject, CanonicalValue, Canonicalize};
use crate::crypto::{Keypair, Sha256Hash};
use crate::error::CanonicalizationError;
use crate::timestamp::CanonicalTimestamp;

/// The usage context a proof was produced for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProofPurpose {
    #[default]
    AssertionMethod,
    Authentication,
    CapabilityDelegation,
}

impl ProofPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AssertionMethod => "assertionMethod",
            Self::Authentication => "authentication",
            Self::CapabilityDelegation => "capabilityDelegation",
        }
    }
}

impl fmt::Display for ProofPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Signature algorithm named by `proofType`.
///
/// Unrecognized tags are kept verbatim so the record still parses and the
/// verifier can reject it with a precise reason.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ProofAlgorithm {
    Ed25519,
    EcdsaP256,
    RsaPss,
    Other(String),
}

impl ProofAlgorithm {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Ed25519 => "Ed25519Signature2020",
            Self::EcdsaP256 => "EcdsaSecp256r1Signature2019",
            Self::RsaPss => "RsaPssSignature2018",
            Self::Other(tag) => tag,
        }
    }
}

impl FromStr for ProofAlgorithm {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "Ed25519Signature2020" => Self::Ed25519,
            "EcdsaSecp256r1Signature2019" => Self::EcdsaP256,
            "RsaPssSignature2018" => Self::RsaPss,
            other => Self::Other(other.to_string()),
        })
    }
}

impl TryFrom<String> for ProofAlgorithm {
    type Error = std::convert::Infallible;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<ProofAlgorithm> for String {
    fn from(alg: ProofAlgorithm) -> Self {
        alg.as_str().to_string()
    }
}

impl fmt::Display for ProofAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The attestation block of a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attestation {
    pub attestor_id: String,
    pub attestation_timestamp: CanonicalTimestamp,
    pub proof_type: ProofAlgorithm,
    pub proof_value: String,
    pub verification_method_uri: String,
    #[serde(default)]
    pub proof_purpose: ProofPurpose,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor_uri: Option<String>,
}

impl Attestation {
    /// An attestation with an empty proof, to be filled by signing.
    pub fn unsigned(
        attestor_id: impl Into<String>,
        verification_method_uri: impl Into<String>,
        attestation_timestamp: CanonicalTimestamp,
    ) -> Self {
        Self {
            attestor_id: attestor_id.into(),
            attestation_timestamp,
            proof_type: ProofAlgorithm::Ed25519,
            proof_value: String::new(),
            verification_method_uri: verification_method_uri.into(),
            proof_purpose: ProofPurpose::default(),
            anchor_uri: None,
        }
    }

    pub fn with_purpose(mut self, purpose: ProofPurpose) -> Self {
        self.proof_purpose = purpose;
        self
    }

    pub fn with_anchor(mut self, uri: impl Into<String>) -> Self {
        self.anchor_uri = Some(uri.into());
        self
    }

    /// Sign `digest` with Ed25519 and store the base58btc proof.
    pub fn sign_ed25519(mut self, keypair: &Keypair, digest: &Sha256Hash) -> Self {
        self.proof_type = ProofAlgorithm::Ed25519;
        self.proof_value = keypair.sign(digest.as_bytes()).to_multibase();
        self
    }
}

impl Canonicalize for Attestation {
    fn to_canonical_value(&self) -> Result<CanonicalValue, CanonicalizationError> {
        Ok(CanonicalObject::new()
            .optional("anchorUri", self.anchor_uri.as_ref())
            .required("attestationTimestamp", &self.attestation_timestamp)
            .required("attestorId", &self.attestor_id)
            .required("proofPurpose", self.proof_purpose.as_str())
            .required("proofType", self.proof_type.as_str())
            .required("proofValue", &self.proof_value)
            .required("verificationMethodUri", &self.verification_method_uri)
            .build())
    }
}
