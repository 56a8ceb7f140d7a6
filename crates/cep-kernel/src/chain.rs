//! Revision chain validation.
//!
//! Each logical id owns an append-only log. A candidate revision is chained
//! only when it is exactly one past the stored head and names the head's
//! record digest as its `previousRecordHash`.

use cep_kernel_core::{
    hash_record, CanonicalizationError, HashedRecord, Record, Sha256Hash, VerificationError,
};
use cep_kernel_store::RevisionEntry;

use crate::config::ChainHashMode;

/// Checks candidates against the stored head of their log.
#[derive(Debug, Clone, Copy, Default)]
pub struct RevisionChainValidator {
    mode: ChainHashMode,
}

impl RevisionChainValidator {
    pub fn new(mode: ChainHashMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> ChainHashMode {
        self.mode
    }

    /// The digest a successor of `record` must declare.
    pub fn record_digest(&self, record: &Record) -> Result<HashedRecord, CanonicalizationError> {
        hash_record(record, self.mode.attestation_mode())
    }

    /// Validate `record` against `latest`, the stored head of its log.
    pub fn check(
        &self,
        record: &Record,
        latest: Option<&RevisionEntry>,
    ) -> Result<(), VerificationError> {
        let logical_id = record.logical_id();
        let revision = record.revision_number();
        let declared = record.previous_record_hash().copied();

        let (expected_revision, expected_hash): (u64, Option<Sha256Hash>) = match latest {
            None => (1, None),
            Some(head) => {
                if head.record_type != record.record_type() {
                    return Err(VerificationError::Structural(format!(
                        "{logical_id} is a {} log, got a {} revision",
                        head.record_type,
                        record.record_type()
                    )));
                }
                (head.revision() + 1, Some(head.record_digest))
            }
        };

        if revision != expected_revision {
            return Err(VerificationError::RevisionSequence {
                logical_id: logical_id.to_string(),
                expected: expected_revision,
                got: revision,
            });
        }

        if declared != expected_hash {
            return Err(VerificationError::HashMismatch {
                logical_id: logical_id.to_string(),
                expected: expected_hash,
                got: declared,
            });
        }

        Ok(())
    }

    /// Build the log entry for an accepted revision.
    pub fn entry(
        &self,
        record: &Record,
        signed: &HashedRecord,
    ) -> Result<RevisionEntry, CanonicalizationError> {
        let record_digest = match self.mode {
            ChainHashMode::ExcludeAttestation => signed.digest,
            ChainHashMode::IncludeAttestation => self.record_digest(record)?.digest,
        };
        Ok(RevisionEntry {
            key: record.key(),
            record_type: record.record_type(),
            previous_record_hash: record.previous_record_hash().copied(),
            record_digest,
            content_digest: signed.digest,
            canonical: signed.canonical.as_str().to_string(),
            record: record.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cep_kernel_core::{
        AttestationMode, CanonicalTimestamp, EntityBuilder, Identifiers, Keypair, RejectCode,
        RelationshipBuilder,
    };

    fn kp() -> Keypair {
        Keypair::from_seed(&[0x42; 32])
    }

    fn entity(revision: u64, previous: Option<Sha256Hash>, name: &str) -> Record {
        EntityBuilder::new("e1", name, "US-IL")
            .identifiers(Identifiers::new().with_sam_uei("J6H4FB3N5YK7"))
            .revision(revision, previous)
            .attestor("cep-node:test", "did:web:test#k")
            .attested_at("2025-01-01T00:00:00Z".parse().unwrap())
            .sign(&kp())
            .unwrap()
    }

    fn head(validator: &RevisionChainValidator, record: &Record) -> RevisionEntry {
        let signed = hash_record(record, AttestationMode::Exclude).unwrap();
        validator.entry(record, &signed).unwrap()
    }

    fn code(result: Result<(), VerificationError>) -> RejectCode {
        result.unwrap_err().code()
    }

    #[test]
    fn test_first_revision() {
        let v = RevisionChainValidator::default();
        assert!(v.check(&entity(1, None, "A"), None).is_ok());
        assert_eq!(
            code(v.check(&entity(2, Some(Sha256Hash::hash(b"x")), "A"), None)),
            RejectCode::RevisionSequence
        );
    }

    #[test]
    fn test_successor_links_to_head() {
        let v = RevisionChainValidator::default();
        let r1 = entity(1, None, "A");
        let h1 = head(&v, &r1);

        let r2 = entity(2, Some(h1.record_digest), "B");
        assert!(v.check(&r2, Some(&h1)).is_ok());

        let wrong_hash = entity(2, Some(h1.content_digest), "B");
        assert_eq!(code(v.check(&wrong_hash, Some(&h1))), RejectCode::HashMismatch);

        let gap = entity(3, Some(h1.record_digest), "B");
        assert_eq!(code(v.check(&gap, Some(&h1))), RejectCode::RevisionSequence);

        let duplicate = entity(1, None, "C");
        assert_eq!(code(v.check(&duplicate, Some(&h1))), RejectCode::RevisionSequence);
    }

    #[test]
    fn test_modes_link_different_digests() {
        let r1 = entity(1, None, "A");
        let include = head(&RevisionChainValidator::new(ChainHashMode::IncludeAttestation), &r1);
        let exclude = head(&RevisionChainValidator::new(ChainHashMode::ExcludeAttestation), &r1);

        assert_ne!(include.record_digest, exclude.record_digest);
        assert_eq!(exclude.record_digest, exclude.content_digest);
        assert_eq!(include.content_digest, exclude.content_digest);
    }

    #[test]
    fn test_record_type_cannot_change() {
        let v = RevisionChainValidator::default();
        let h1 = head(&v, &entity(1, None, "A"));

        let rel = RelationshipBuilder::new(
            "e1",
            "https://civic.example/vocab/relationship-type/grant",
            "US-IL",
            CanonicalTimestamp::parse("2025-01-01T00:00:00Z").unwrap(),
        )
        .revision(2, Some(h1.record_digest))
        .attestor("cep-node:test", "did:web:test#k")
        .sign(&kp())
        .unwrap();
        assert_eq!(code(v.check(&rel, Some(&h1))), RejectCode::Structural);
    }
}
