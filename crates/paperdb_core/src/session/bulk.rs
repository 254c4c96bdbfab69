//! Bulk document loading.
//!
//! Bulk inserts trade atomicity for throughput: the input is partitioned
//! into consecutive batches and each batch commits in its own independent
//! transaction. A failing batch rolls back only itself - batches committed
//! before it stay committed. This partial-success behavior is a documented
//! contract, not an accident of implementation, and is covered by
//! integration tests. Bulk-loaded documents bypass the session identity
//! map entirely.

use crate::config::SessionConfig;
use crate::document::{DocId, Document, IdStyle};
use crate::error::{SessionError, SessionResult};
use crate::schema::DocumentStorage;
use paperdb_codec::to_payload;
use paperdb_storage::{SqlBackend, TransactionScope};

/// Partitions `documents` into batches of `batch_size` and writes each in
/// its own transaction, in partition order.
pub(crate) fn run<T: Document>(
    backend: &dyn SqlBackend,
    storage: &DocumentStorage,
    config: &SessionConfig,
    mut documents: Vec<T>,
    batch_size: usize,
) -> SessionResult<u64> {
    if batch_size == 0 {
        return Err(SessionError::invalid_argument(
            "bulk batch size must be at least 1",
        ));
    }
    if documents.is_empty() {
        return Ok(0);
    }

    let mut conn = backend.connect().map_err(SessionError::transaction)?;
    if config.auto_create_storage {
        conn.execute(&storage.schema_ddl())
            .map_err(SessionError::transaction)?;
    }

    let total_batches = documents.len().div_ceil(batch_size);
    let mut written = 0u64;
    for (index, chunk) in documents.chunks_mut(batch_size).enumerate() {
        let rows = prepare_rows(storage, chunk)?;
        let mut scope =
            TransactionScope::begin(&mut *conn).map_err(SessionError::transaction)?;
        written += storage
            .bulk_insert_page(&mut scope, &rows)
            .map_err(SessionError::transaction)?;
        scope.commit().map_err(SessionError::transaction)?;
        tracing::debug!(
            batch = index + 1,
            of = total_batches,
            rows = rows.len(),
            table = %storage.mapping().table,
            "bulk batch committed"
        );
    }
    Ok(written)
}

/// Serializes one batch, assigning identities where the type generates
/// them. Runs before the batch's transaction, so a bad document fails its
/// batch without touching the store.
fn prepare_rows<T: Document>(
    storage: &DocumentStorage,
    chunk: &mut [T],
) -> SessionResult<Vec<(DocId, String)>> {
    let mut rows = Vec::with_capacity(chunk.len());
    for document in chunk.iter_mut() {
        let mut id = document.document_id();
        if id.is_unassigned() {
            match storage.mapping().id_style {
                IdStyle::Generated => {
                    id = DocId::generate();
                    document.set_document_id(id.clone());
                }
                IdStyle::Assigned => {
                    return Err(SessionError::invalid_argument(format!(
                        "cannot bulk-insert a '{}' document without an assigned identity",
                        T::NAME
                    )));
                }
            }
        }
        rows.push((id, to_payload(document)?));
    }
    Ok(rows)
}
