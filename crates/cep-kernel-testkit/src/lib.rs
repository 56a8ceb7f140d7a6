//! # CEP Kernel Testkit
//!
//! Testing utilities for the CEP kernel.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Conformance vectors**: Records with their expected canonical strings,
//!   digests and signatures, for cross-implementation checks
//! - **Generators**: Proptest strategies for property-based testing
//! - **Fixtures**: Attestors, kernels and pre-filled record builders
//!
//! ## Conformance Vectors
//!
//! ```rust
//! use cep_kernel_testkit::vectors::verify_all_vectors;
//!
//! for (name, matches, digest) in verify_all_vectors() {
//!     println!("{name}: {digest} ({})", if matches { "ok" } else { "DIVERGED" });
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use cep_kernel_testkit::generators::{entity_from_params, EntityParams};
//!
//! proptest! {
//!     #[test]
//!     fn digest_is_deterministic(params: EntityParams) {
//!         let a = entity_from_params(&params).unwrap();
//!         let b = entity_from_params(&params).unwrap();
//!         prop_assert_eq!(a, b);
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust,ignore
//! use cep_kernel_testkit::fixtures::TestFixture;
//!
//! let fx = TestFixture::new().await;
//! let kernel = fx.kernel();
//! let entity = fx.entity("e1", "Springfield", "US-IL").sign(&fx.keypair)?;
//! let outcome = kernel.submit(entity).await?;
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{fixed_timestamp, multi_party_fixtures, TestFixture};
pub use generators::{entity_from_params, exchange_from_params, permuted_json, EntityParams, ExchangeParams};
pub use vectors::{all_vectors, record_from_vector, verify_all_vectors, ConformanceVector, VectorRecord};
