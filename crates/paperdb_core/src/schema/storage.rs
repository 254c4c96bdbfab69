//! Per-type command builders.

use crate::document::DocId;
use crate::schema::Mapping;
use paperdb_storage::{SqlCommand, StorageResult, TransactionScope};
use std::fmt::Write as _;
use std::sync::Arc;

/// Command builders for one document type's storage.
///
/// A `DocumentStorage` is resolved once per type from the
/// [`SchemaProvider`](crate::schema::SchemaProvider) and turns identities
/// and payloads into executable commands. All parameters are bound
/// positionally; no caller value ever lands in command text.
#[derive(Debug)]
pub struct DocumentStorage {
    mapping: Arc<Mapping>,
}

impl DocumentStorage {
    pub(crate) fn new(mapping: Arc<Mapping>) -> Self {
        Self { mapping }
    }

    /// The mapping this storage was built from.
    #[must_use]
    pub fn mapping(&self) -> &Mapping {
        &self.mapping
    }

    /// Command fetching a single payload by identity.
    #[must_use]
    pub fn load_command(&self, id: &DocId) -> SqlCommand {
        let m = &*self.mapping;
        SqlCommand::new(
            format!(
                "select {} from {} where {} = @0",
                m.data_column, m.table, m.id_column
            ),
            vec![id.as_param()],
        )
    }

    /// Command fetching payloads for an identity array.
    #[must_use]
    pub fn load_many_command(&self, ids: &[DocId]) -> SqlCommand {
        let m = &*self.mapping;
        let mut text = format!(
            "select {} from {} where {} in (",
            m.data_column, m.table, m.id_column
        );
        for i in 0..ids.len() {
            if i > 0 {
                text.push_str(", ");
            }
            let _ = write!(text, "@{i}");
        }
        text.push(')');
        SqlCommand::new(text, ids.iter().map(DocId::as_param).collect())
    }

    /// Command inserting a new document row.
    #[must_use]
    pub fn insert_command(&self, id: &DocId, payload: &str) -> SqlCommand {
        let m = &*self.mapping;
        SqlCommand::new(
            format!(
                "insert into {} ({}, {}) values (@0, @1)",
                m.table, m.id_column, m.data_column
            ),
            vec![id.as_param(), payload.into()],
        )
    }

    /// Command writing a document row whether or not it exists.
    #[must_use]
    pub fn upsert_command(&self, id: &DocId, payload: &str) -> SqlCommand {
        let m = &*self.mapping;
        SqlCommand::new(
            format!(
                "insert into {} ({}, {}) values (@0, @1) \
                 on conflict ({}) do update set {} = excluded.{}",
                m.table, m.id_column, m.data_column, m.id_column, m.data_column, m.data_column
            ),
            vec![id.as_param(), payload.into()],
        )
    }

    /// Command deleting a document row by identity.
    #[must_use]
    pub fn delete_command(&self, id: &DocId) -> SqlCommand {
        let m = &*self.mapping;
        SqlCommand::new(
            format!("delete from {} where {} = @0", m.table, m.id_column),
            vec![id.as_param()],
        )
    }

    /// The create-table statement for this type's storage.
    #[must_use]
    pub fn schema_ddl(&self) -> SqlCommand {
        let m = &*self.mapping;
        SqlCommand::bare(format!(
            "create table if not exists {} ({} text primary key, {} text not null)",
            m.table, m.id_column, m.data_column
        ))
    }

    /// Writes one bulk page of rows inside the given transaction.
    ///
    /// # Errors
    ///
    /// Propagates the first failing insert; the caller's scope rolls the
    /// page back.
    pub fn bulk_insert_page(
        &self,
        scope: &mut TransactionScope<'_>,
        rows: &[(DocId, String)],
    ) -> StorageResult<u64> {
        let mut written = 0;
        for (id, payload) in rows {
            written += scope.execute(&self.insert_command(id, payload))?;
        }
        Ok(written)
    }
}
