//! Pending physical operations derived from the identity map.

use crate::document::DocId;
use crate::session::map::MapKey;
use paperdb_storage::SqlCommand;

/// The kind of physical operation a change performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// Insert a new document row.
    Insert,
    /// Write a document row over a previously loaded or existing one.
    Upsert,
    /// Delete a document row.
    Delete,
}

/// A single pending physical operation.
///
/// Changes are derived from identity-map entries in registration order and
/// executed in that order inside one commit transaction; the commit
/// protocol never reorders or groups them.
#[derive(Debug, Clone)]
pub struct Change {
    pub(crate) key: MapKey,
    pub(crate) kind: ChangeKind,
    pub(crate) table: String,
    pub(crate) command: SqlCommand,
    pub(crate) schema_ddl: SqlCommand,
}

impl Change {
    /// The operation kind.
    #[must_use]
    pub fn kind(&self) -> ChangeKind {
        self.kind
    }

    /// The backing table the change targets.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// The identity the change targets.
    #[must_use]
    pub fn id(&self) -> &DocId {
        &self.key.id
    }

    /// The physical command the change executes at commit.
    #[must_use]
    pub fn command(&self) -> &SqlCommand {
        &self.command
    }
}
