//! # PaperDB Core
//!
//! Document session engine for PaperDB.
//!
//! PaperDB stores serde-serializable documents as JSON payloads inside a
//! relational backing store and presents object-level semantics on top:
//!
//! - [`DocumentStore`] owns the backend and schema and opens sessions
//! - [`Session`] is a unit of work: an identity map guaranteeing one
//!   in-memory instance per (type, identity), pending changes committed in
//!   one ordered transaction by [`Session::save_changes`], batched bulk
//!   loading, and ad-hoc or composable queries
//! - [`SchemaProvider`] resolves each document type to its storage shape
//!   and command builders once, then caches them
//!
//! ## Example
//!
//! ```rust
//! use paperdb_core::{DocId, Document, DocumentStore};
//! use paperdb_storage::InMemoryBackend;
//! use serde::{Deserialize, Serialize};
//! use std::sync::Arc;
//!
//! #[derive(Serialize, Deserialize)]
//! struct Person {
//!     id: String,
//!     name: String,
//! }
//!
//! impl Document for Person {
//!     const NAME: &'static str = "people";
//!
//!     fn document_id(&self) -> DocId {
//!         DocId::Text(self.id.clone())
//!     }
//! }
//!
//! let store = DocumentStore::new(Arc::new(InMemoryBackend::new()));
//! let mut session = store.open_session();
//! session
//!     .store(Person { id: "p1".into(), name: "Ann".into() })
//!     .unwrap();
//! session.save_changes().unwrap();
//!
//! let person = session.load::<Person>("p1").unwrap().unwrap();
//! assert_eq!(person.name, "Ann");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod document;
mod error;
mod query;
mod schema;
mod session;

pub use config::SessionConfig;
pub use document::{DocId, Document, IdStyle};
pub use error::{SessionError, SessionResult};
pub use query::Queryable;
pub use schema::{DocumentStorage, Mapping, SchemaProvider};
pub use session::{Change, ChangeKind, Diagnostics, DocumentStore, Session, StorageDefinition};
