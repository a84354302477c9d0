//! Shared test utilities for tenure integration tests.
//!
//! This crate provides:
//! - [`Harness`]: a projector wired to in-memory collaborators and a fixed clock
//! - [`TracingStore`]: in-memory store with operation recording and failure injection
//! - [`RecordingSiblingClient`]: sibling client with scripted failures
//! - Factory functions for event payloads
//! - Custom assertion helpers
//!
//! # Example
//!
//! ```rust,ignore
//! use tenure_test_utils::{ContractFactory, Harness};
//!
//! #[tokio::test]
//! async fn test_example() {
//!     let harness = Harness::new();
//!     let (_, contract_id) = harness.create_contract(&ContractFactory::annual()).await;
//!     // ... send more events ...
//! }
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]
// Test utilities use expect/unwrap for cleaner test code - panics are acceptable in tests
#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::missing_panics_doc)]

pub mod assertions;
pub mod fixtures;
pub mod sibling;
pub mod storage;

pub use assertions::*;
pub use fixtures::*;
pub use sibling::*;
pub use storage::*;

/// Initialize test logging (call once per test module).
pub fn init_test_logging() {
    use tracing_subscriber::{EnvFilter, fmt};

    let _ = fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("tenure=debug".parse().expect("valid directive")),
        )
        .with_test_writer()
        .try_init();
}
