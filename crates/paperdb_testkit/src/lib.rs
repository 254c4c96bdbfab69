//! # PaperDB Testkit
//!
//! Test fixtures and harnesses for PaperDB.
//!
//! This crate provides:
//! - Document fixtures covering the identity styles (generated UUID,
//!   caller-assigned integer, string natural key)
//! - Store builders over the in-memory backend, with fault injection
//! - Cross-crate integration tests for the session contracts (under
//!   `tests/`)
//!
//! ## Usage
//!
//! ```rust
//! use paperdb_testkit::fixtures::Invoice;
//! use paperdb_testkit::TestStore;
//!
//! let harness = TestStore::memory();
//! let mut session = harness.store.open_session();
//! session.store(Invoice::sample(1)).unwrap();
//! session.save_changes().unwrap();
//! assert_eq!(harness.backend.row_count("invoices"), 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;

use paperdb_core::{DocumentStore, SessionConfig};
use paperdb_storage::{InMemoryBackend, SqlBackend};
use std::sync::Arc;

/// A document store over an in-memory backend, with the backend kept
/// reachable for row assertions and fault injection.
pub struct TestStore {
    /// The backing store.
    pub backend: Arc<InMemoryBackend>,
    /// The document store under test.
    pub store: DocumentStore,
}

impl TestStore {
    /// Creates a store with default configuration.
    #[must_use]
    pub fn memory() -> Self {
        Self::with_config(SessionConfig::default())
    }

    /// Creates a store with custom configuration.
    #[must_use]
    pub fn with_config(config: SessionConfig) -> Self {
        let backend = Arc::new(InMemoryBackend::new());
        let store =
            DocumentStore::with_config(Arc::clone(&backend) as Arc<dyn SqlBackend>, config);
        Self { backend, store }
    }

    /// Creates a store whose backend fails every write after the first
    /// `n` have succeeded.
    #[must_use]
    pub fn failing_after_writes(n: u64) -> Self {
        let harness = Self::memory();
        harness.backend.fail_after_writes(n);
        harness
    }
}

impl Default for TestStore {
    fn default() -> Self {
        Self::memory()
    }
}
