//! # Stowage Testkit
//!
//! Testing utilities for Stowage.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: Known uploads with their expected stored names
//! - **Generators**: Proptest strategies for names, payloads, and params
//! - **Fixtures**: A ready-made in-memory ingestor, plus capability wrappers
//!   that count calls and inject delays or failures
//!
//! ## Golden Vectors
//!
//! ```rust
//! use stowage_testkit::vectors::{all_vectors, stored_name_for};
//!
//! for vector in all_vectors() {
//!     assert_eq!(stored_name_for(&vector), vector.expected_stored_name);
//! }
//! ```
//!
//! ## Instrumented Capabilities
//!
//! ```rust
//! use stowage_testkit::fixtures::CountingWriter;
//! use stowage::store::MemoryStorage;
//!
//! let writer = CountingWriter::new(MemoryStorage::new());
//! writer.fail_writes(true);
//! assert_eq!(writer.writes(), 0);
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use stowage_testkit::generators::UploadParams;
//!
//! proptest! {
//!     #[test]
//!     fn stored_name_is_deterministic(params: UploadParams) {
//!         prop_assert_eq!(params.descriptor().stored_name(), params.descriptor().stored_name());
//!     }
//! }
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{init_tracing, CountingMetadata, CountingWriter, ScriptedOracle, TestFixture};
pub use generators::UploadParams;
pub use vectors::{all_vectors, stored_name_for, verify_all_vectors, GoldenVector};
