//! Attestation policy: expected proof purposes and clock-skew tolerance.

use std::collections::HashMap;
use std::time::Duration;

use cep_kernel_core::{ProofPurpose, RecordType};

/// Rules checked after a signature verifies.
#[derive(Debug, Clone)]
pub struct AttestationPolicy {
    /// How far in the future an attestation timestamp may lie.
    pub clock_skew: Duration,
    /// Expected `proofPurpose` per record type.
    pub expected_purposes: HashMap<RecordType, ProofPurpose>,
}

impl AttestationPolicy {
    /// The purpose a record of `record_type` must declare.
    pub fn expected_purpose(&self, record_type: RecordType) -> ProofPurpose {
        self.expected_purposes
            .get(&record_type)
            .copied()
            .unwrap_or_default()
    }

    pub fn with_purpose(mut self, record_type: RecordType, purpose: ProofPurpose) -> Self {
        self.expected_purposes.insert(record_type, purpose);
        self
    }

    pub fn with_clock_skew(mut self, clock_skew: Duration) -> Self {
        self.clock_skew = clock_skew;
        self
    }
}

impl Default for AttestationPolicy {
    fn default() -> Self {
        let expected_purposes = [RecordType::Entity, RecordType::Relationship, RecordType::Exchange]
            .into_iter()
            .map(|t| (t, ProofPurpose::AssertionMethod))
            .collect();
        Self {
            clock_skew: Duration::from_secs(5 * 60),
            expected_purposes,
        }
    }
}
