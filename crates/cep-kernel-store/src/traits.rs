//! RevisionStore trait: the abstract interface for revision-log persistence.
//!
//! The kernel never owns long-term storage. It reads the latest entry of a
//! logical id before validating a new revision and asks the store to append
//! after acceptance. Implementations live outside the kernel; the in-memory
//! one here backs tests and single-process deployments.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use cep_kernel_core::{Record, RecordKey, RecordType, Sha256Hash};

use crate::error::Result;

/// One accepted revision in a per-logical-id log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevisionEntry {
    /// (logical id, revision number).
    pub key: RecordKey,
    pub record_type: RecordType,
    /// The predecessor digest the revision declared.
    pub previous_record_hash: Option<Sha256Hash>,
    /// Digest successors must name as their `previousRecordHash`.
    pub record_digest: Sha256Hash,
    /// Digest of the attestation-excluded canonical form (the signed digest).
    pub content_digest: Sha256Hash,
    /// Attestation-excluded canonical string, kept for mismatch triage.
    pub canonical: String,
    /// The raw record as submitted.
    pub record: Record,
}

impl RevisionEntry {
    pub fn logical_id(&self) -> &str {
        &self.key.logical_id
    }

    pub fn revision(&self) -> u64 {
        self.key.revision
    }
}

/// Result of a compare-and-swap append.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppendResult {
    /// The entry is now the latest revision of its logical id.
    Appended,
    /// The identical entry is already stored at this position (idempotent).
    AlreadyExists,
    /// The latest revision moved since the caller read it.
    Conflict {
        /// The revision currently at the head of the log.
        current: Option<u64>,
    },
}

/// The RevisionStore trait: async interface for revision logs.
///
/// # Design Notes
///
/// - **Append-only**: entries are never overwritten or deleted.
/// - **Compare-and-swap**: `append` succeeds only if the head of the log is
///   still `expected_latest`, so two candidates that observed the same
///   predecessor cannot both be chained.
/// - **Idempotent appends**: re-appending the identical entry returns
///   `AlreadyExists`.
#[async_trait]
pub trait RevisionStore: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Reads
    // ─────────────────────────────────────────────────────────────────────────

    /// Get the latest accepted revision of a logical id.
    async fn latest(&self, logical_id: &str) -> Result<Option<RevisionEntry>>;

    /// Get one revision by key.
    async fn get(&self, key: &RecordKey) -> Result<Option<RevisionEntry>>;

    /// Get every revision of a logical id, ordered by revision number.
    async fn history(&self, logical_id: &str) -> Result<Vec<RevisionEntry>>;

    /// List every logical id with at least one revision.
    async fn logical_ids(&self) -> Result<Vec<String>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Writes
    // ─────────────────────────────────────────────────────────────────────────

    /// Append `entry` if the log head is still `expected_latest`.
    ///
    /// `expected_latest` is `None` when the caller observed no prior revision.
    async fn append(
        &self,
        entry: RevisionEntry,
        expected_latest: Option<u64>,
    ) -> Result<AppendResult>;
}

/// Extension trait for common store patterns.
pub trait RevisionStoreExt: RevisionStore {
    /// The head revision number of a logical id, if any.
    fn head_revision(
        &self,
        logical_id: &str,
    ) -> impl std::future::Future<Output = Result<Option<u64>>> + Send;

    /// Every stored entry, grouped by logical id and ordered by revision.
    fn all_entries(&self) -> impl std::future::Future<Output = Result<Vec<RevisionEntry>>> + Send;
}

impl<S: RevisionStore + ?Sized> RevisionStoreExt for S {
    async fn head_revision(&self, logical_id: &str) -> Result<Option<u64>> {
        Ok(self.latest(logical_id).await?.map(|e| e.revision()))
    }

    async fn all_entries(&self) -> Result<Vec<RevisionEntry>> {
        let mut ids = self.logical_ids().await?;
        ids.sort();

        let mut entries = Vec::new();
        for id in ids {
            entries.extend(self.history(&id).await?);
        }
        Ok(entries)
    }
}
