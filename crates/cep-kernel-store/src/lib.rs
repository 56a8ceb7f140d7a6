//! # CEP Kernel Store
//!
//! Repository abstraction for the CEP kernel's append-only revision logs.
//!
//! ## Overview
//!
//! Persistence is owned by an external storage collaborator. The kernel
//! reaches it through the [`RevisionStore`] trait: it reads the latest entry
//! of a logical id before validating a candidate revision and appends with
//! compare-and-swap after acceptance. [`MemoryStore`] is the in-process
//! implementation.
//!
//! ## Key Types
//!
//! - [`RevisionStore`] - The async trait for revision-log operations
//! - [`MemoryStore`] - In-memory storage
//! - [`RevisionEntry`] - One accepted revision
//! - [`AppendResult`] - Outcome of a compare-and-swap append

pub mod error;
pub mod memory;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use traits::{AppendResult, RevisionEntry, RevisionStore, RevisionStoreExt};
