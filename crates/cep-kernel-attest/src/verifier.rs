//! The attestation verifier state machine.
//!
//! ```text
//! RESOLVE_KEY -> CANONICALIZE -> VERIFY_SIGNATURE -> POLICY_CHECK -> ACCEPT
//!      |              |                |                  |
//!      +--------------+----------------+------------------+--> REJECT
//! ```
//!
//! A lookup that reports the key as not yet available ends in PENDING.
//! The verifier never mutates anything; it returns a verdict.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use cep_kernel_core::{
    decode_proof_value, hash_record, AttestationMode, HashedRecord, Record, VerificationError,
};

use crate::policy::AttestationPolicy;
use crate::resolver::{KeyLookup, KeyResolver, PublicKeyMaterial};
use crate::scheme::SchemeRegistry;

/// Result of verifying one record's attestation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttestationVerdict {
    /// Signature and policy hold. Carries the signed canonical form and digest.
    Accepted(HashedRecord),
    /// Terminal failure for this record.
    Rejected(VerificationError),
    /// Key material is not available yet.
    Pending { verification_method_uri: String },
}

impl AttestationVerdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted(_))
    }
}

/// Steps of the verification state machine.
#[derive(Debug)]
enum Step {
    ResolveKey,
    Canonicalize(PublicKeyMaterial),
    VerifySignature(PublicKeyMaterial, HashedRecord),
    PolicyCheck(HashedRecord),
}

/// Verifies record attestations against resolved keys.
#[derive(Clone)]
pub struct AttestationVerifier {
    resolver: Arc<dyn KeyResolver>,
    schemes: SchemeRegistry,
    policy: AttestationPolicy,
    resolution_timeout: Option<Duration>,
}

impl AttestationVerifier {
    pub fn new(resolver: Arc<dyn KeyResolver>, policy: AttestationPolicy) -> Self {
        Self {
            resolver,
            schemes: SchemeRegistry::default(),
            policy,
            resolution_timeout: None,
        }
    }

    pub fn with_schemes(mut self, schemes: SchemeRegistry) -> Self {
        self.schemes = schemes;
        self
    }

    /// Bound key resolution; an elapsed lookup yields PENDING.
    pub fn with_resolution_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.resolution_timeout = timeout;
        self
    }

    pub fn policy(&self) -> &AttestationPolicy {
        &self.policy
    }

    /// Verify against the current time.
    pub async fn verify(&self, record: &Record) -> AttestationVerdict {
        self.verify_at(record, Utc::now()).await
    }

    /// Verify with `now` as the reference time for the clock-skew check.
    pub async fn verify_at(&self, record: &Record, now: DateTime<Utc>) -> AttestationVerdict {
        let attestation = record.attestation();
        let uri = attestation.verification_method_uri.as_str();
        let mut step = Step::ResolveKey;

        loop {
            step = match step {
                Step::ResolveKey => match self.resolve(uri).await {
                    Ok(KeyLookup::Resolved(key)) => Step::Canonicalize(key),
                    Ok(KeyLookup::Pending) => {
                        tracing::debug!(uri, logical_id = %record.logical_id(), "key resolution pending");
                        return AttestationVerdict::Pending {
                            verification_method_uri: uri.to_string(),
                        };
                    }
                    Err(err) => return AttestationVerdict::Rejected(err.into()),
                },

                Step::Canonicalize(key) => match hash_record(record, AttestationMode::Exclude) {
                    Ok(hashed) => Step::VerifySignature(key, hashed),
                    Err(err) => return AttestationVerdict::Rejected(err.into()),
                },

                Step::VerifySignature(key, hashed) => {
                    if let Err(err) = self.check_signature(record, &key, &hashed) {
                        return AttestationVerdict::Rejected(err);
                    }
                    Step::PolicyCheck(hashed)
                }

                Step::PolicyCheck(hashed) => {
                    return match self.check_policy(record, now) {
                        Ok(()) => AttestationVerdict::Accepted(hashed),
                        Err(err) => AttestationVerdict::Rejected(err),
                    };
                }
            };
        }
    }

    async fn resolve(&self, uri: &str) -> Result<KeyLookup, crate::error::KeyResolutionError> {
        match self.resolution_timeout {
            Some(limit) => match tokio::time::timeout(limit, self.resolver.resolve(uri)).await {
                Ok(result) => result,
                Err(_) => {
                    tracing::debug!(uri, ?limit, "key resolution timed out");
                    Ok(KeyLookup::Pending)
                }
            },
            None => self.resolver.resolve(uri).await,
        }
    }

    fn check_signature(
        &self,
        record: &Record,
        key: &PublicKeyMaterial,
        hashed: &HashedRecord,
    ) -> Result<(), VerificationError> {
        let attestation = record.attestation();
        let algorithm = &attestation.proof_type;

        if &key.algorithm != algorithm {
            return Err(VerificationError::SignatureMismatch(format!(
                "key at {} is {}, proof is {}",
                attestation.verification_method_uri, key.algorithm, algorithm
            )));
        }

        let scheme = self.schemes.get(algorithm).ok_or_else(|| {
            VerificationError::SignatureMismatch(format!("no verifier registered for {algorithm}"))
        })?;

        let signature = decode_proof_value(&attestation.proof_value)
            .map_err(|e| VerificationError::SignatureMismatch(format!("proofValue: {e}")))?;

        scheme
            .verify(&key.key, hashed.digest.as_bytes(), &signature)
            .map_err(|e| VerificationError::SignatureMismatch(e.to_string()))
    }

    fn check_policy(&self, record: &Record, now: DateTime<Utc>) -> Result<(), VerificationError> {
        let attestation = record.attestation();

        let expected = self.policy.expected_purpose(record.record_type());
        if attestation.proof_purpose != expected {
            return Err(VerificationError::AttestationPolicy(format!(
                "proofPurpose {} does not match expected {} for {}",
                attestation.proof_purpose,
                expected,
                record.record_type()
            )));
        }

        let ahead = attestation
            .attestation_timestamp
            .as_datetime()
            .signed_duration_since(now);
        // to_std fails for negative durations, i.e. timestamps in the past
        if let Ok(ahead) = ahead.to_std() {
            if ahead > self.policy.clock_skew {
                return Err(VerificationError::AttestationPolicy(format!(
                    "attestationTimestamp {} is {}s in the future",
                    attestation.attestation_timestamp,
                    ahead.as_secs()
                )));
            }
        }

        Ok(())
    }
}

impl std::fmt::Debug for AttestationVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttestationVerifier")
            .field("schemes", &self.schemes)
            .field("policy", &self.policy)
            .field("resolution_timeout", &self.resolution_timeout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::StaticKeyResolver;
    use async_trait::async_trait;
    use cep_kernel_core::{
        CanonicalTimestamp, EntityBuilder, Identifiers, Keypair, ProofAlgorithm, ProofPurpose,
        RejectCode,
    };

    const KEY_URI: &str = "did:web:springfield.gov#key-1";

    fn at(s: &str) -> CanonicalTimestamp {
        s.parse().unwrap()
    }

    fn now() -> DateTime<Utc> {
        at("2025-06-01T12:00:00Z").as_datetime()
    }

    fn keypair() -> Keypair {
        Keypair::from_seed(&[0x42; 32])
    }

    fn builder() -> EntityBuilder {
        EntityBuilder::new("e1", "Springfield USD", "US-IL")
            .identifiers(Identifiers::new().with_sam_uei("J6H4FB3N5YK7"))
            .attestor("cep-node:springfield", KEY_URI)
            .attested_at(at("2025-06-01T11:59:00Z"))
    }

    async fn verifier() -> AttestationVerifier {
        let resolver = StaticKeyResolver::new();
        resolver
            .insert(KEY_URI, PublicKeyMaterial::ed25519(&keypair().public_key()))
            .await;
        AttestationVerifier::new(Arc::new(resolver), AttestationPolicy::default())
    }

    fn code(verdict: AttestationVerdict) -> RejectCode {
        match verdict {
            AttestationVerdict::Rejected(err) => err.code(),
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_accepts_valid_signature() {
        let record = builder().sign(&keypair()).unwrap();
        let verdict = verifier().await.verify_at(&record, now()).await;
        match verdict {
            AttestationVerdict::Accepted(hashed) => {
                assert!(!hashed.canonical.as_str().contains("attestation"));
            }
            other => panic!("expected accept, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_tampered_record_mismatches() {
        let mut record = builder().sign(&keypair()).unwrap();
        if let Record::Entity(e) = &mut record {
            e.jurisdiction_iso = "US-IN".into();
        }
        let verdict = verifier().await.verify_at(&record, now()).await;
        assert_eq!(code(verdict), RejectCode::SignatureMismatch);
    }

    #[tokio::test]
    async fn test_wrong_key_mismatches() {
        let record = builder().sign(&Keypair::from_seed(&[9; 32])).unwrap();
        let verdict = verifier().await.verify_at(&record, now()).await;
        assert_eq!(code(verdict), RejectCode::SignatureMismatch);
    }

    #[tokio::test]
    async fn test_unknown_key_rejects() {
        let record = builder()
            .attestor("cep-node:x", "did:web:nowhere#k")
            .sign(&keypair())
            .unwrap();
        let verdict = verifier().await.verify_at(&record, now()).await;
        assert_eq!(code(verdict), RejectCode::KeyResolution);
    }

    #[tokio::test]
    async fn test_pending_key() {
        let resolver = StaticKeyResolver::new();
        resolver.mark_pending(KEY_URI).await;
        let verifier = AttestationVerifier::new(Arc::new(resolver), AttestationPolicy::default());

        let record = builder().sign(&keypair()).unwrap();
        assert_eq!(
            verifier.verify_at(&record, now()).await,
            AttestationVerdict::Pending {
                verification_method_uri: KEY_URI.into()
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_yields_pending() {
        struct Hanging;
        #[async_trait]
        impl KeyResolver for Hanging {
            async fn resolve(&self, _: &str) -> crate::error::Result<KeyLookup> {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(KeyLookup::Pending)
            }
        }

        let verifier = AttestationVerifier::new(Arc::new(Hanging), AttestationPolicy::default())
            .with_resolution_timeout(Some(Duration::from_secs(2)));
        let record = builder().sign(&keypair()).unwrap();
        assert!(matches!(
            verifier.verify_at(&record, now()).await,
            AttestationVerdict::Pending { .. }
        ));
    }

    #[tokio::test]
    async fn test_wrong_purpose_violates_policy() {
        let record = builder()
            .purpose(ProofPurpose::CapabilityDelegation)
            .sign(&keypair())
            .unwrap();
        let verdict = verifier().await.verify_at(&record, now()).await;
        assert_eq!(code(verdict), RejectCode::AttestationPolicy);
    }

    #[tokio::test]
    async fn test_future_timestamp_beyond_skew() {
        let within = builder()
            .attested_at(at("2025-06-01T12:04:00Z"))
            .sign(&keypair())
            .unwrap();
        assert!(verifier().await.verify_at(&within, now()).await.is_accepted());

        let beyond = builder()
            .attested_at(at("2025-06-01T12:06:00Z"))
            .sign(&keypair())
            .unwrap();
        let verdict = verifier().await.verify_at(&beyond, now()).await;
        assert_eq!(code(verdict), RejectCode::AttestationPolicy);
    }

    #[tokio::test]
    async fn test_unregistered_algorithm() {
        let manual = ProofAlgorithm::Other("ManualAttestation".into());
        let resolver = StaticKeyResolver::new();
        resolver
            .insert(KEY_URI, PublicKeyMaterial::new(manual.clone(), vec![1, 2, 3]))
            .await;
        let verifier = AttestationVerifier::new(Arc::new(resolver), AttestationPolicy::default());

        let mut record = builder().sign(&keypair()).unwrap();
        record.attestation_mut().proof_type = manual;
        let verdict = verifier.verify_at(&record, now()).await;
        assert_eq!(code(verdict), RejectCode::SignatureMismatch);
    }

    #[tokio::test]
    async fn test_ecdsa_p256_attestation() {
        use p256::ecdsa::signature::Signer as _;

        let signing = p256::ecdsa::SigningKey::from_slice(&[0x17; 32]).unwrap();
        let public = signing.verifying_key().to_encoded_point(true);
        let resolver = StaticKeyResolver::new();
        resolver
            .insert(
                KEY_URI,
                PublicKeyMaterial::new(ProofAlgorithm::EcdsaP256, public.as_bytes()),
            )
            .await;
        let verifier = AttestationVerifier::new(Arc::new(resolver), AttestationPolicy::default());

        let mut record = builder().sign(&keypair()).unwrap();
        let digest = hash_record(&record, AttestationMode::Exclude).unwrap().digest;
        let signature: p256::ecdsa::Signature = signing.sign(digest.as_bytes());
        record.attestation_mut().proof_type = ProofAlgorithm::EcdsaP256;
        record.attestation_mut().proof_value = hex::encode(signature.to_bytes());
        assert!(verifier.verify_at(&record, now()).await.is_accepted());

        if let Record::Entity(e) = &mut record {
            e.legal_name = "Shelbyville USD".into();
        }
        let verdict = verifier.verify_at(&record, now()).await;
        assert_eq!(code(verdict), RejectCode::SignatureMismatch);
    }

    #[tokio::test]
    async fn test_hex_proof_value_accepted() {
        let kp = keypair();
        let mut record = builder().sign(&kp).unwrap();
        let digest = hash_record(&record, AttestationMode::Exclude).unwrap().digest;
        record.attestation_mut().proof_value = kp.sign(digest.as_bytes()).to_hex();
        assert!(verifier().await.verify_at(&record, now()).await.is_accepted());
    }
}
