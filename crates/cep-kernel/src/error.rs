//! Error types for the Kernel.
//!
//! These are infrastructure failures. A record that fails verification is
//! not an error; it produces a rejected [`Verdict`](crate::Verdict).

use cep_kernel_store::StoreError;
use thiserror::Error;

/// Errors that can occur during Kernel operations.
#[derive(Debug, Error)]
pub enum KernelError {
    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// The log head kept moving under concurrent writers.
    #[error("commit of {logical_id} lost {attempts} compare-and-swap races")]
    Contention { logical_id: String, attempts: usize },

    /// A stored entry could not be replayed into the graph.
    #[error("inconsistent store: {0}")]
    Inconsistent(String),

    /// A batch task panicked or was cancelled.
    #[error("submission task failed: {0}")]
    Task(String),
}

/// Result type for Kernel operations.
pub type Result<T> = std::result::Result<T, KernelError>;
