//! # PaperDB Storage
//!
//! SQL command model and backend abstraction for PaperDB.
//!
//! This crate provides the lowest-level storage seam for PaperDB. Backends
//! are **command runners**: they accept [`SqlCommand`]s with positionally
//! bound parameters and return affected-row counts or payload rows. PaperDB
//! core owns all command construction - backends do not understand
//! documents, identity maps, or sessions.
//!
//! ## Design Principles
//!
//! - Parameters travel out-of-band as [`ParamValue`]s and are referenced
//!   as `@0`, `@1`, ... in command text; values are never inlined.
//! - Transaction boundaries are explicit and scoped via [`TransactionScope`],
//!   which rolls back on drop unless committed.
//! - Backends must be `Send + Sync`; connections are single-owner.
//!
//! ## Available Backends
//!
//! - [`InMemoryBackend`] - For testing and ephemeral stores
//!
//! ## Example
//!
//! ```rust
//! use paperdb_storage::{InMemoryBackend, SqlBackend, SqlCommand, ParamValue};
//!
//! let backend = InMemoryBackend::new();
//! let mut conn = backend.connect().unwrap();
//! conn.execute(&SqlCommand::new(
//!     "create table if not exists people (id text primary key, data text not null)",
//!     vec![],
//! ))
//! .unwrap();
//! conn.execute(&SqlCommand::new(
//!     "insert into people (id, data) values (@0, @1)",
//!     vec![ParamValue::from("p1"), ParamValue::from("{\"age\":30}")],
//! ))
//! .unwrap();
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod command;
mod error;
mod memory;
mod scope;

pub use backend::{SqlBackend, SqlConnection};
pub use command::{ParamValue, SqlCommand};
pub use error::{StorageError, StorageResult};
pub use memory::InMemoryBackend;
pub use scope::TransactionScope;
