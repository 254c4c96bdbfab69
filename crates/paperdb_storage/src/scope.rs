//! Scoped transaction guard.

use crate::backend::SqlConnection;
use crate::command::SqlCommand;
use crate::error::StorageResult;

/// A transaction scoped to a lexical region.
///
/// `TransactionScope` opens a transaction on construction and guarantees it
/// is closed on every exit path: [`commit`](Self::commit) consumes the scope,
/// and dropping an uncommitted scope rolls the transaction back. Error
/// propagation through `?` therefore always reaches rollback before control
/// returns to the caller.
///
/// # Example
///
/// ```rust
/// use paperdb_storage::{InMemoryBackend, SqlBackend, SqlCommand, TransactionScope};
///
/// let backend = InMemoryBackend::new();
/// let mut conn = backend.connect().unwrap();
/// conn.execute(&SqlCommand::bare(
///     "create table if not exists notes (id text primary key, data text not null)",
/// ))
/// .unwrap();
///
/// let mut scope = TransactionScope::begin(&mut *conn).unwrap();
/// scope
///     .execute(&SqlCommand::new(
///         "insert into notes (id, data) values (@0, @1)",
///         vec!["n1".into(), "{}".into()],
///     ))
///     .unwrap();
/// scope.commit().unwrap();
/// ```
pub struct TransactionScope<'c> {
    conn: &'c mut dyn SqlConnection,
    finished: bool,
}

impl<'c> TransactionScope<'c> {
    /// Opens a transaction on the connection.
    ///
    /// # Errors
    ///
    /// Returns an error if a transaction is already open.
    pub fn begin(conn: &'c mut dyn SqlConnection) -> StorageResult<Self> {
        conn.begin()?;
        Ok(Self {
            conn,
            finished: false,
        })
    }

    /// Executes a statement inside the transaction.
    ///
    /// # Errors
    ///
    /// Propagates the statement failure; the scope still rolls back on drop.
    pub fn execute(&mut self, command: &SqlCommand) -> StorageResult<u64> {
        self.conn.execute(command)
    }

    /// Executes a query inside the transaction.
    ///
    /// # Errors
    ///
    /// Propagates the query failure; the scope still rolls back on drop.
    pub fn query(&mut self, command: &SqlCommand) -> StorageResult<Vec<String>> {
        self.conn.query(command)
    }

    /// Commits the transaction, consuming the scope.
    ///
    /// After `commit` returns - successfully or not - the transaction is
    /// closed and the drop guard takes no further action.
    ///
    /// # Errors
    ///
    /// Returns an error if the commit fails.
    pub fn commit(mut self) -> StorageResult<()> {
        self.finished = true;
        self.conn.commit()
    }
}

impl Drop for TransactionScope<'_> {
    fn drop(&mut self) {
        if !self.finished {
            // Best effort; the original error (if any) is already propagating.
            let _ = self.conn.rollback();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SqlBackend;
    use crate::memory::InMemoryBackend;

    fn ddl() -> SqlCommand {
        SqlCommand::bare("create table if not exists t (id text primary key, data text not null)")
    }

    fn insert(id: &str) -> SqlCommand {
        SqlCommand::new(
            "insert into t (id, data) values (@0, @1)",
            vec![id.into(), "{}".into()],
        )
    }

    #[test]
    fn commit_makes_writes_visible() {
        let backend = InMemoryBackend::new();
        let mut conn = backend.connect().unwrap();
        conn.execute(&ddl()).unwrap();

        let mut scope = TransactionScope::begin(&mut *conn).unwrap();
        scope.execute(&insert("a")).unwrap();
        scope.commit().unwrap();

        assert_eq!(backend.row_count("t"), 1);
    }

    #[test]
    fn dropped_scope_rolls_back() {
        let backend = InMemoryBackend::new();
        let mut conn = backend.connect().unwrap();
        conn.execute(&ddl()).unwrap();

        {
            let mut scope = TransactionScope::begin(&mut *conn).unwrap();
            scope.execute(&insert("a")).unwrap();
            // dropped without commit
        }

        assert_eq!(backend.row_count("t"), 0);
    }

    #[test]
    fn failed_statement_then_drop_leaves_store_untouched() {
        let backend = InMemoryBackend::new();
        let mut conn = backend.connect().unwrap();
        conn.execute(&ddl()).unwrap();
        conn.execute(&insert("dup")).unwrap();

        {
            let mut scope = TransactionScope::begin(&mut *conn).unwrap();
            scope.execute(&insert("a")).unwrap();
            let err = scope.execute(&insert("dup")).unwrap_err();
            assert!(matches!(err, crate::StorageError::DuplicateKey { .. }));
        }

        // Only the pre-existing row remains.
        assert_eq!(backend.row_count("t"), 1);
    }
}
