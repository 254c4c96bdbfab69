//! Backend and connection trait definitions.

use crate::command::SqlCommand;
use crate::error::StorageResult;

/// A low-level command runner for PaperDB.
///
/// Backends are **command runners**: they execute [`SqlCommand`]s against a
/// relational store and return affected-row counts or payload rows. PaperDB
/// core owns command construction and transaction boundaries - backends do
/// not understand documents or sessions.
///
/// # Invariants
///
/// - `connect` hands out an independent connection; connections are
///   single-owner and not shared across callers
/// - Backends must be `Send + Sync`
///
/// # Implementors
///
/// - [`super::InMemoryBackend`] - for testing and ephemeral stores
pub trait SqlBackend: Send + Sync {
    /// Opens a connection to the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unreachable.
    fn connect(&self) -> StorageResult<Box<dyn SqlConnection + '_>>;
}

/// A live connection to the backing store.
///
/// At most one transaction is open per connection at a time; transactions
/// are never nested. Statements executed outside an open transaction are
/// applied immediately (autocommit).
pub trait SqlConnection {
    /// Opens a transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if a transaction is already open.
    fn begin(&mut self) -> StorageResult<()>;

    /// Commits the open transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if no transaction is open or the commit fails.
    fn commit(&mut self) -> StorageResult<()>;

    /// Rolls back the open transaction, discarding its writes.
    ///
    /// # Errors
    ///
    /// Returns an error if no transaction is open.
    fn rollback(&mut self) -> StorageResult<()>;

    /// Executes a statement, returning the affected-row count.
    ///
    /// # Errors
    ///
    /// Returns an error if the command cannot be interpreted, violates a
    /// constraint, or the store fails.
    fn execute(&mut self, command: &SqlCommand) -> StorageResult<u64>;

    /// Executes a query, returning one payload string per matching row.
    ///
    /// Rows come back in the store's own order, which is not necessarily
    /// the order of any caller-supplied keys.
    ///
    /// # Errors
    ///
    /// Returns an error if the command cannot be interpreted or the store
    /// fails.
    fn query(&mut self, command: &SqlCommand) -> StorageResult<Vec<String>>;
}
