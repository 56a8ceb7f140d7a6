//! In-memory implementation of the RevisionStore trait.
//!
//! Keeps every revision log in memory with no persistence. Used by tests and
//! by single-process deployments that replay from an external source.

use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use cep_kernel_core::RecordKey;

use crate::error::{Result, StoreError};
use crate::traits::{AppendResult, RevisionEntry, RevisionStore};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    /// Per-logical-id logs: revision -> entry.
    logs: HashMap<String, BTreeMap<u64, RevisionEntry>>,
}

impl MemoryStoreInner {
    fn head(&self, logical_id: &str) -> Option<&RevisionEntry> {
        self.logs
            .get(logical_id)
            .and_then(|log| log.values().next_back())
    }
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryStoreInner::default()),
        }
    }

    /// Total number of stored revisions across all logical ids.
    pub fn len(&self) -> usize {
        self.read()
            .map(|inner| inner.logs.values().map(BTreeMap::len).sum())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryStoreInner>> {
        self.inner.read().map_err(|_| StoreError::Poisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryStoreInner>> {
        self.inner.write().map_err(|_| StoreError::Poisoned)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RevisionStore for MemoryStore {
    async fn latest(&self, logical_id: &str) -> Result<Option<RevisionEntry>> {
        let inner = self.read()?;
        Ok(inner.head(logical_id).cloned())
    }

    async fn get(&self, key: &RecordKey) -> Result<Option<RevisionEntry>> {
        let inner = self.read()?;
        Ok(inner
            .logs
            .get(&key.logical_id)
            .and_then(|log| log.get(&key.revision))
            .cloned())
    }

    async fn history(&self, logical_id: &str) -> Result<Vec<RevisionEntry>> {
        let inner = self.read()?;
        Ok(inner
            .logs
            .get(logical_id)
            .map(|log| log.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn logical_ids(&self) -> Result<Vec<String>> {
        let inner = self.read()?;
        Ok(inner.logs.keys().cloned().collect())
    }

    async fn append(
        &self,
        entry: RevisionEntry,
        expected_latest: Option<u64>,
    ) -> Result<AppendResult> {
        let mut inner = self.write()?;

        // Identical entry already stored at this position
        if let Some(existing) = inner
            .logs
            .get(entry.logical_id())
            .and_then(|log| log.get(&entry.revision()))
        {
            if existing.record_digest == entry.record_digest {
                return Ok(AppendResult::AlreadyExists);
            }
        }

        // Compare-and-swap against the head of the log
        let current = inner.head(entry.logical_id()).map(RevisionEntry::revision);
        if current != expected_latest {
            tracing::debug!(
                logical_id = %entry.logical_id(),
                revision = entry.revision(),
                ?expected_latest,
                ?current,
                "append conflict"
            );
            return Ok(AppendResult::Conflict { current });
        }

        inner
            .logs
            .entry(entry.key.logical_id.clone())
            .or_default()
            .insert(entry.revision(), entry);

        Ok(AppendResult::Appended)
    }
}
