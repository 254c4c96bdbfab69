//! Session facade and document store.

mod bulk;
mod change;
mod map;

pub use change::{Change, ChangeKind};

use crate::config::SessionConfig;
use crate::document::{DocId, Document, IdStyle};
use crate::error::{SessionError, SessionResult};
use crate::query::{translate, Queryable};
use crate::schema::{DocumentStorage, SchemaProvider};
use crate::session::map::{DocumentMap, EntryStatus, MapKey};
use paperdb_codec::{from_payload, to_payload};
use paperdb_storage::{ParamValue, SqlBackend, SqlCommand, TransactionScope};
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

/// The long-lived entry point: owns the backend, schema provider, and
/// configuration, and opens independent sessions.
///
/// A store is cheap to share (`Send + Sync`); sessions are not - each
/// session is owned by exactly one logical unit of work at a time.
///
/// # Example
///
/// ```rust,ignore
/// let store = DocumentStore::new(Arc::new(backend));
/// let mut session = store.open_session();
/// session.store(person)?;
/// session.save_changes()?;
/// ```
pub struct DocumentStore {
    backend: Arc<dyn SqlBackend>,
    schema: Arc<SchemaProvider>,
    config: SessionConfig,
}

impl DocumentStore {
    /// Creates a store with default configuration.
    pub fn new(backend: Arc<dyn SqlBackend>) -> Self {
        Self::with_config(backend, SessionConfig::default())
    }

    /// Creates a store with custom configuration.
    pub fn with_config(backend: Arc<dyn SqlBackend>, config: SessionConfig) -> Self {
        Self {
            backend,
            schema: Arc::new(SchemaProvider::new()),
            config,
        }
    }

    /// The store's schema provider, for registering mapping overrides.
    #[must_use]
    pub fn schema(&self) -> &SchemaProvider {
        &self.schema
    }

    /// The store's configuration.
    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Creates the backing table for a document type if it is missing.
    ///
    /// Sessions do this lazily when
    /// [`auto_create_storage`](SessionConfig::auto_create_storage) is on;
    /// this method exists for explicit schema bootstrap.
    ///
    /// # Errors
    ///
    /// Returns an error if the statement fails.
    pub fn ensure_storage<T: Document>(&self) -> SessionResult<()> {
        let storage = self.schema.storage::<T>();
        let mut conn = self.backend.connect()?;
        conn.execute(&storage.schema_ddl())?;
        Ok(())
    }

    /// Opens a new session with an empty identity map.
    #[must_use]
    pub fn open_session(&self) -> Session {
        let session_id = Uuid::new_v4();
        tracing::trace!(%session_id, "session opened");
        Session {
            backend: Arc::clone(&self.backend),
            schema: Arc::clone(&self.schema),
            config: self.config.clone(),
            session_id,
            map: DocumentMap::default(),
            ensured: HashSet::new(),
        }
    }
}

impl std::fmt::Debug for DocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentStore")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// A unit of work over the document store.
///
/// The session tracks every document it loads, stores, or deletes in its
/// identity map, guaranteeing at most one in-memory instance per (type,
/// identity). Writes accumulate as pending changes until
/// [`save_changes`](Self::save_changes) commits them in one transaction,
/// in registration order.
///
/// Sessions are single-owner: all mutating operations take `&mut self`,
/// and the identity map has no internal locking. Documents themselves are
/// shared - `store` and `load` hand back `Arc<T>` handles to the same
/// instance the session tracks.
pub struct Session {
    backend: Arc<dyn SqlBackend>,
    schema: Arc<SchemaProvider>,
    config: SessionConfig,
    session_id: Uuid,
    map: DocumentMap,
    ensured: HashSet<String>,
}

impl Session {
    /// Registers a document for write and returns the tracked handle.
    ///
    /// For [`IdStyle::Generated`] types a fresh identity is assigned when
    /// the document carries none; the assigned identity becomes the map
    /// key. Storing over a previously loaded identity replaces the tracked
    /// instance and commits as an upsert.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidArgument`] if the document has no
    /// identity and the type does not generate them, or
    /// [`SessionError::Codec`] if it cannot be serialized (nothing is
    /// registered in that case).
    pub fn store<T: Document>(&mut self, mut document: T) -> SessionResult<Arc<T>> {
        let storage = self.schema.storage::<T>();
        let mut id = document.document_id();
        if id.is_unassigned() {
            match storage.mapping().id_style {
                IdStyle::Generated => {
                    id = DocId::generate();
                    document.set_document_id(id.clone());
                }
                IdStyle::Assigned => {
                    return Err(SessionError::invalid_argument(format!(
                        "cannot store a '{}' document without an assigned identity",
                        T::NAME
                    )));
                }
            }
        }
        let payload = to_payload(&document)?;
        let instance = Arc::new(document);
        self.map
            .store(&storage, id.clone(), Arc::clone(&instance), payload);
        tracing::trace!(table = %storage.mapping().table, %id, "registered for write");
        Ok(instance)
    }

    /// Registers several documents for write.
    ///
    /// # Errors
    ///
    /// Stops at the first rejected document; earlier ones stay registered.
    pub fn store_many<T: Document>(
        &mut self,
        documents: impl IntoIterator<Item = T>,
    ) -> SessionResult<Vec<Arc<T>>> {
        documents.into_iter().map(|d| self.store(d)).collect()
    }

    /// Marks a document deleted by instance.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidArgument`] if the document carries no
    /// identity.
    pub fn delete<T: Document>(&mut self, document: &T) -> SessionResult<()> {
        self.delete_by_id::<T>(document.document_id())
    }

    /// Marks an identity deleted, with or without a prior load.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidArgument`] for an unassigned
    /// identity.
    pub fn delete_by_id<T: Document>(&mut self, id: impl Into<DocId>) -> SessionResult<()> {
        let id = id.into();
        if id.is_unassigned() {
            return Err(SessionError::invalid_argument(format!(
                "cannot delete a '{}' document by an unassigned identity",
                T::NAME
            )));
        }
        let storage = self.schema.storage::<T>();
        self.map.mark_deleted::<T>(&storage, id.clone());
        tracing::trace!(table = %storage.mapping().table, %id, "registered for delete");
        Ok(())
    }

    /// Loads a document by identity.
    ///
    /// The identity map is consulted first: a tracked instance is returned
    /// as-is, and an identity deleted in this session reads as absent. On
    /// a map miss the store is fetched, the payload deserialized, and the
    /// instance registered under the payload's own embedded identity (which
    /// wins if it differs from the requested one).
    ///
    /// Returns `None` when the identity is absent; a miss is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Storage`] for fetch failures and
    /// [`SessionError::Codec`] when the payload does not deserialize.
    pub fn load<T: Document>(&mut self, id: impl Into<DocId>) -> SessionResult<Option<Arc<T>>> {
        let id = id.into();
        let key = MapKey::of::<T>(id.clone());
        if let Some(entry) = self.map.entry(&key) {
            if entry.status() == EntryStatus::Deleted {
                return Ok(None);
            }
            if let Some(instance) = entry.instance::<T>() {
                return Ok(Some(instance));
            }
        }
        let storage = self.schema.storage::<T>();
        let rows = self.fetch(&storage, &storage.load_command(&id))?;
        let Some(payload) = rows.into_iter().next() else {
            return Ok(None);
        };
        let document: T = from_payload(&payload)?;
        let resolved = Self::reconcile_id(id, &document);
        Ok(Some(self.map.loaded(&storage, resolved, document, payload)))
    }

    /// Loads documents for an identity array with one fetch.
    ///
    /// Each returned payload is deserialized independently and resolved
    /// through the identity map individually. Results follow the store's
    /// return order, not the input key order; identities deleted in this
    /// session are omitted.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Storage`] for fetch failures and
    /// [`SessionError::Codec`] when a payload does not deserialize.
    pub fn load_many<T: Document>(&mut self, ids: &[DocId]) -> SessionResult<Vec<Arc<T>>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let storage = self.schema.storage::<T>();
        let rows = self.fetch(&storage, &storage.load_many_command(ids))?;
        self.resolve_rows(&storage, rows)
    }

    /// Runs an ad-hoc text query.
    ///
    /// Text that does not already read as a complete query is wrapped as
    /// `select <data> from <table> <text>`; parameters are bound
    /// positionally as `@0`, `@1`, ... on either path and are never
    /// inlined into the text. Every row passes through the same identity
    /// resolution as [`load`](Self::load).
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Storage`] for query failures and
    /// [`SessionError::Codec`] when a payload does not deserialize.
    pub fn query<T: Document>(
        &mut self,
        text: &str,
        params: Vec<ParamValue>,
    ) -> SessionResult<Vec<Arc<T>>> {
        let storage = self.schema.storage::<T>();
        let command = translate::ad_hoc(text, params, storage.mapping());
        tracing::debug!(command = %command.text, "ad-hoc query");
        let rows = self.fetch(&storage, &command)?;
        self.resolve_rows(&storage, rows)
    }

    /// Creates a lazy query descriptor bound to this session.
    #[must_use]
    pub fn queryable<T: Document>(&self) -> Queryable<T> {
        Queryable::new(self.session_id)
    }

    /// Executes a queryable produced by this session.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidArgument`] for a queryable produced
    /// by a different session, plus the failure modes of
    /// [`query`](Self::query).
    pub fn execute<T: Document>(&mut self, queryable: &Queryable<T>) -> SessionResult<Vec<Arc<T>>> {
        if queryable.stamp() != self.session_id {
            return Err(SessionError::invalid_argument(
                "queryable was produced by a different session",
            ));
        }
        let storage = self.schema.storage::<T>();
        let command = queryable.to_command(storage.mapping());
        let rows = self.fetch(&storage, &command)?;
        self.resolve_rows(&storage, rows)
    }

    /// Bulk-inserts documents using the configured batch size.
    ///
    /// See [`bulk_insert_with`](Self::bulk_insert_with).
    ///
    /// # Errors
    ///
    /// See [`bulk_insert_with`](Self::bulk_insert_with).
    pub fn bulk_insert<T: Document>(&mut self, documents: Vec<T>) -> SessionResult<u64> {
        let batch_size = self.config.bulk_batch_size;
        self.bulk_insert_with(documents, batch_size)
    }

    /// Bulk-inserts documents in independent batches of `batch_size`.
    ///
    /// Each batch commits in its own transaction, in partition order. A
    /// failing batch rolls back only itself: batches committed before it
    /// **stay committed**. Bulk-loaded documents bypass the identity map,
    /// so loading one afterwards fetches from the store.
    ///
    /// Returns the number of rows written.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Transaction`] when a batch fails (earlier
    /// batches remain persisted) and [`SessionError::InvalidArgument`] for
    /// a zero batch size or an identity-less document of a non-generating
    /// type.
    pub fn bulk_insert_with<T: Document>(
        &mut self,
        documents: Vec<T>,
        batch_size: usize,
    ) -> SessionResult<u64> {
        let storage = self.schema.storage::<T>();
        bulk::run(&*self.backend, &storage, &self.config, documents, batch_size)
    }

    /// Commits all pending changes in one transaction.
    ///
    /// Changes execute in registration order; the protocol never reorders
    /// or groups them. On success the map's pending state is cleared and
    /// the number of applied changes returned. On failure the transaction
    /// is rolled back, nothing is observably persisted, and every pending
    /// change stays in the map for inspection or retry - retrying is the
    /// caller's decision.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Transaction`] after rollback.
    pub fn save_changes(&mut self) -> SessionResult<usize> {
        let changes = self.map.pending_changes();
        if changes.is_empty() {
            return Ok(0);
        }
        let mut conn = self.backend.connect().map_err(SessionError::transaction)?;
        if self.config.auto_create_storage {
            for c in &changes {
                if self.ensured.insert(c.table.clone()) {
                    conn.execute(&c.schema_ddl)
                        .map_err(SessionError::transaction)?;
                }
            }
        }
        {
            let mut scope =
                TransactionScope::begin(&mut *conn).map_err(SessionError::transaction)?;
            for change in &changes {
                scope
                    .execute(&change.command)
                    .map_err(SessionError::transaction)?;
            }
            scope.commit().map_err(SessionError::transaction)?;
        }
        let applied = changes.len();
        self.map.changes_applied(&changes);
        tracing::debug!(applied, "unit of work committed");
        Ok(applied)
    }

    /// The operations a commit would currently perform, in registration
    /// order.
    ///
    /// After a failed [`save_changes`](Self::save_changes) this is exactly
    /// the list that was rolled back, available for inspection before a
    /// retry.
    #[must_use]
    pub fn pending_changes(&self) -> Vec<Change> {
        self.map.pending_changes()
    }

    /// Number of operations a commit would currently perform.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.map.pending_count()
    }

    /// Number of identities tracked by this session.
    #[must_use]
    pub fn tracked_count(&self) -> usize {
        self.map.len()
    }

    /// Read-only introspection over this session's schema and queries.
    #[must_use]
    pub fn diagnostics(&self) -> Diagnostics<'_> {
        Diagnostics { session: self }
    }

    /// Fetches payload rows, creating the table first when configured to.
    fn fetch(
        &mut self,
        storage: &DocumentStorage,
        command: &SqlCommand,
    ) -> SessionResult<Vec<String>> {
        let table = &storage.mapping().table;
        let ensure = self.config.auto_create_storage && !self.ensured.contains(table);
        let mut conn = self.backend.connect()?;
        if ensure {
            conn.execute(&storage.schema_ddl())?;
            self.ensured.insert(table.clone());
        }
        Ok(conn.query(command)?)
    }

    /// Deserializes fetched rows and resolves each through the identity
    /// map.
    fn resolve_rows<T: Document>(
        &mut self,
        storage: &Arc<DocumentStorage>,
        rows: Vec<String>,
    ) -> SessionResult<Vec<Arc<T>>> {
        let mut documents = Vec::with_capacity(rows.len());
        for payload in rows {
            let document: T = from_payload(&payload)?;
            let id = document.document_id();
            if self.map.is_deleted(&MapKey::of::<T>(id.clone())) {
                continue;
            }
            documents.push(self.map.loaded(storage, id, document, payload));
        }
        Ok(documents)
    }

    /// The payload's embedded identity wins over the identity the caller
    /// looked up with, guarding against the two drifting apart.
    fn reconcile_id<T: Document>(requested: DocId, document: &T) -> DocId {
        let embedded = document.document_id();
        if embedded.is_unassigned() {
            requested
        } else {
            embedded
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("session_id", &self.session_id)
            .field("tracked", &self.map.len())
            .field("pending", &self.map.pending_count())
            .finish_non_exhaustive()
    }
}

/// Read-only introspection over a session.
///
/// Nothing here executes against the store.
pub struct Diagnostics<'s> {
    session: &'s Session,
}

impl Diagnostics<'_> {
    /// Builds the physical command for a queryable without executing it.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidArgument`] for a queryable produced
    /// by a different session.
    pub fn command_for<T: Document>(&self, queryable: &Queryable<T>) -> SessionResult<SqlCommand> {
        if queryable.stamp() != self.session.session_id {
            return Err(SessionError::invalid_argument(
                "queryable was produced by a different session",
            ));
        }
        let storage = self.session.schema.storage::<T>();
        Ok(queryable.to_command(storage.mapping()))
    }

    /// The generated storage definition for a document type.
    #[must_use]
    pub fn storage_definition_for<T: Document>(&self) -> StorageDefinition {
        let storage = self.session.schema.storage::<T>();
        let mapping = storage.mapping();
        StorageDefinition {
            table: mapping.table.clone(),
            id_column: mapping.id_column.clone(),
            data_column: mapping.data_column.clone(),
            schema_ddl: storage.schema_ddl().text,
        }
    }
}

/// The generated physical storage definition for a document type.
#[derive(Debug, Clone)]
pub struct StorageDefinition {
    /// The backing table name.
    pub table: String,
    /// The identity column name.
    pub id_column: String,
    /// The payload column name.
    pub data_column: String,
    /// The create-table statement.
    pub schema_ddl: String,
}

impl std::fmt::Display for StorageDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.schema_ddl)
    }
}
