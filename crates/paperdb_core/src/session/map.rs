//! The session identity map.

use crate::document::{DocId, Document};
use crate::schema::DocumentStorage;
use crate::session::change::{Change, ChangeKind};
use std::any::{Any, TypeId};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Key under which a session tracks a document instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct MapKey {
    pub(crate) type_id: TypeId,
    pub(crate) id: DocId,
}

impl MapKey {
    pub(crate) fn of<T: Document>(id: DocId) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            id,
        }
    }
}

/// Lifecycle state of a tracked identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EntryStatus {
    /// Loaded from the store, no pending write.
    Loaded,
    /// Registered for write (fresh or stored over an existing entry).
    Added,
    /// Marked for deletion.
    Deleted,
    /// Pending work committed; tracked for identity only.
    Unchanged,
}

/// One tracked identity: the live instance (absent once deleted), the
/// last-known payload, the payload baseline from load/commit time (no-op
/// update detection), and the lifecycle status.
pub(crate) struct MapEntry {
    key: MapKey,
    storage: Arc<DocumentStorage>,
    document: Option<Arc<dyn Any + Send + Sync>>,
    payload: Option<String>,
    baseline: Option<String>,
    status: EntryStatus,
    /// Set when a store overwrote a delete-only entry: the row's presence
    /// in the backing table is unknown, so the write must be an upsert.
    force_upsert: bool,
}

impl MapEntry {
    pub(crate) fn status(&self) -> EntryStatus {
        self.status
    }

    /// The tracked instance downcast to its document type.
    ///
    /// The map key carries the `TypeId`, so a live entry always downcasts
    /// for the type it was registered under.
    pub(crate) fn instance<T: Document>(&self) -> Option<Arc<T>> {
        let doc = self.document.as_ref()?;
        Arc::clone(doc).downcast::<T>().ok()
    }
}

/// Identity map: every document instance loaded, stored, or deleted within
/// the session's lifetime, keyed by (type, identity), in registration
/// order.
#[derive(Default)]
pub(crate) struct DocumentMap {
    entries: Vec<MapEntry>,
    index: HashMap<MapKey, usize>,
}

impl DocumentMap {
    pub(crate) fn entry(&self, key: &MapKey) -> Option<&MapEntry> {
        self.index.get(key).map(|&i| &self.entries[i])
    }

    pub(crate) fn is_deleted(&self, key: &MapKey) -> bool {
        self.entry(key)
            .is_some_and(|e| e.status == EntryStatus::Deleted)
    }

    fn upsert_entry(&mut self, key: MapKey, storage: &Arc<DocumentStorage>) -> &mut MapEntry {
        let i = match self.index.get(&key) {
            Some(&i) => i,
            None => {
                let i = self.entries.len();
                self.entries.push(MapEntry {
                    key: key.clone(),
                    storage: Arc::clone(storage),
                    document: None,
                    payload: None,
                    baseline: None,
                    status: EntryStatus::Unchanged,
                    force_upsert: false,
                });
                self.index.insert(key, i);
                i
            }
        };
        &mut self.entries[i]
    }

    /// Registers a freshly deserialized instance.
    ///
    /// If the identity is already tracked with a live instance, that
    /// instance wins and the fresh one is discarded - the session never
    /// holds two instances for one identity.
    pub(crate) fn loaded<T: Document>(
        &mut self,
        storage: &Arc<DocumentStorage>,
        id: DocId,
        document: T,
        payload: String,
    ) -> Arc<T> {
        let key = MapKey::of::<T>(id);
        if let Some(existing) = self.entry(&key).and_then(MapEntry::instance::<T>) {
            return existing;
        }
        let instance = Arc::new(document);
        let entry = self.upsert_entry(key, storage);
        entry.document = Some(instance.clone());
        entry.payload = Some(payload.clone());
        entry.baseline = Some(payload);
        entry.status = EntryStatus::Loaded;
        instance
    }

    /// Registers an instance for write, overwriting whatever the entry
    /// held before. An entry with a load baseline commits as an upsert; a
    /// fresh entry commits as an insert.
    pub(crate) fn store<T: Document>(
        &mut self,
        storage: &Arc<DocumentStorage>,
        id: DocId,
        document: Arc<T>,
        payload: String,
    ) {
        let key = MapKey::of::<T>(id);
        let entry = self.upsert_entry(key, storage);
        if entry.status == EntryStatus::Deleted {
            entry.force_upsert = true;
        }
        entry.document = Some(document);
        entry.payload = Some(payload);
        entry.status = EntryStatus::Added;
    }

    /// Marks an identity deleted; registers a delete-only entry when the
    /// identity was never loaded (delete-without-load).
    pub(crate) fn mark_deleted<T: Document>(&mut self, storage: &Arc<DocumentStorage>, id: DocId) {
        let key = MapKey::of::<T>(id);
        let entry = self.upsert_entry(key, storage);
        entry.document = None;
        entry.status = EntryStatus::Deleted;
    }

    fn change_for(entry: &MapEntry) -> Option<(ChangeKind, paperdb_storage::SqlCommand)> {
        match entry.status {
            EntryStatus::Added => {
                let payload = entry.payload.as_deref()?;
                match entry.baseline.as_deref() {
                    Some(baseline) if baseline == payload => None,
                    None if !entry.force_upsert => Some((
                        ChangeKind::Insert,
                        entry.storage.insert_command(&entry.key.id, payload),
                    )),
                    _ => Some((
                        ChangeKind::Upsert,
                        entry.storage.upsert_command(&entry.key.id, payload),
                    )),
                }
            }
            EntryStatus::Deleted => Some((
                ChangeKind::Delete,
                entry.storage.delete_command(&entry.key.id),
            )),
            EntryStatus::Loaded | EntryStatus::Unchanged => None,
        }
    }

    /// Derives the pending operation list, in registration order.
    pub(crate) fn pending_changes(&self) -> Vec<Change> {
        self.entries
            .iter()
            .filter_map(|entry| {
                Self::change_for(entry).map(|(kind, command)| Change {
                    key: entry.key.clone(),
                    kind,
                    table: entry.storage.mapping().table.clone(),
                    command,
                    schema_ddl: entry.storage.schema_ddl(),
                })
            })
            .collect()
    }

    /// Number of operations a commit would currently perform.
    pub(crate) fn pending_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| Self::change_for(e).is_some())
            .count()
    }

    /// Clears applied changes from pending state.
    ///
    /// Applied writes become [`EntryStatus::Unchanged`] with a refreshed
    /// baseline; applied deletes drop their entries so the identity can be
    /// fetched fresh. Idempotent: already-cleared entries are skipped.
    pub(crate) fn changes_applied(&mut self, changes: &[Change]) {
        let mut removed: HashSet<MapKey> = HashSet::new();
        for change in changes {
            let Some(&i) = self.index.get(&change.key) else {
                continue;
            };
            let entry = &mut self.entries[i];
            match change.kind {
                ChangeKind::Insert | ChangeKind::Upsert => {
                    if entry.status == EntryStatus::Added {
                        entry.status = EntryStatus::Unchanged;
                        entry.baseline = entry.payload.clone();
                        entry.force_upsert = false;
                    }
                }
                ChangeKind::Delete => {
                    if entry.status == EntryStatus::Deleted {
                        removed.insert(change.key.clone());
                    }
                }
            }
        }
        if !removed.is_empty() {
            self.entries.retain(|e| !removed.contains(&e.key));
            self.index.clear();
            for (i, entry) in self.entries.iter().enumerate() {
                self.index.insert(entry.key.clone(), i);
            }
        }
    }

    /// Number of tracked identities.
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Mapping;
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    struct Note {
        id: String,
        body: String,
    }

    impl Document for Note {
        const NAME: &'static str = "notes";

        fn document_id(&self) -> DocId {
            DocId::Text(self.id.clone())
        }
    }

    fn storage() -> Arc<DocumentStorage> {
        let mapping = Mapping::for_document::<Note>();
        Arc::new(DocumentStorage::new(Arc::new(mapping)))
    }

    fn note(id: &str, body: &str) -> (Note, String) {
        let note = Note {
            id: id.into(),
            body: body.into(),
        };
        let payload = paperdb_codec::to_payload(&note).unwrap();
        (note, payload)
    }

    #[test]
    fn loaded_twice_returns_first_instance() {
        let mut map = DocumentMap::default();
        let storage = storage();

        let (first, payload) = note("n1", "one");
        let tracked = map.loaded(&storage, DocId::from("n1"), first, payload);

        let (second, payload2) = note("n1", "two");
        let again = map.loaded(&storage, DocId::from("n1"), second, payload2);

        assert!(Arc::ptr_eq(&tracked, &again));
        assert_eq!(again.body, "one");
    }

    #[test]
    fn fresh_store_becomes_insert() {
        let mut map = DocumentMap::default();
        let storage = storage();
        let (doc, payload) = note("n1", "one");
        map.store(&storage, DocId::from("n1"), Arc::new(doc), payload);

        let changes = map.pending_changes();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].kind(), ChangeKind::Insert);
        assert_eq!(changes[0].table(), "notes");
    }

    #[test]
    fn store_over_loaded_becomes_upsert() {
        let mut map = DocumentMap::default();
        let storage = storage();

        let (doc, payload) = note("n1", "one");
        map.loaded(&storage, DocId::from("n1"), doc, payload);

        let (edited, payload) = note("n1", "two");
        map.store(&storage, DocId::from("n1"), Arc::new(edited), payload);

        let changes = map.pending_changes();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].kind(), ChangeKind::Upsert);
    }

    #[test]
    fn storing_identical_payload_over_loaded_is_a_noop() {
        let mut map = DocumentMap::default();
        let storage = storage();

        let (doc, payload) = note("n1", "same");
        map.loaded(&storage, DocId::from("n1"), doc, payload.clone());

        let (unchanged, _) = note("n1", "same");
        map.store(&storage, DocId::from("n1"), Arc::new(unchanged), payload);

        assert!(map.pending_changes().is_empty());
        assert_eq!(map.pending_count(), 0);
    }

    #[test]
    fn delete_without_load_produces_one_delete() {
        let mut map = DocumentMap::default();
        let storage = storage();
        map.mark_deleted::<Note>(&storage, DocId::from("ghost"));

        let changes = map.pending_changes();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].kind(), ChangeKind::Delete);
        assert_eq!(changes[0].id(), &DocId::from("ghost"));
    }

    #[test]
    fn delete_then_store_commits_an_upsert() {
        let mut map = DocumentMap::default();
        let storage = storage();

        map.mark_deleted::<Note>(&storage, DocId::from("n1"));
        let (doc, payload) = note("n1", "revived");
        map.store(&storage, DocId::from("n1"), Arc::new(doc), payload);

        // The row's presence in the store is unknown, so the single
        // surviving change must be tolerant of either case.
        let changes = map.pending_changes();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].kind(), ChangeKind::Upsert);
    }

    #[test]
    fn changes_preserve_registration_order() {
        let mut map = DocumentMap::default();
        let storage = storage();

        let (a, pa) = note("a", "1");
        map.store(&storage, DocId::from("a"), Arc::new(a), pa);
        map.mark_deleted::<Note>(&storage, DocId::from("b"));
        let (c, pc) = note("c", "3");
        map.store(&storage, DocId::from("c"), Arc::new(c), pc);

        let kinds: Vec<ChangeKind> = map.pending_changes().iter().map(Change::kind).collect();
        assert_eq!(
            kinds,
            vec![ChangeKind::Insert, ChangeKind::Delete, ChangeKind::Insert]
        );
    }

    #[test]
    fn changes_applied_clears_pending_and_is_idempotent() {
        let mut map = DocumentMap::default();
        let storage = storage();

        let (a, pa) = note("a", "1");
        map.store(&storage, DocId::from("a"), Arc::new(a), pa);
        map.mark_deleted::<Note>(&storage, DocId::from("b"));

        let changes = map.pending_changes();
        map.changes_applied(&changes);
        assert_eq!(map.pending_count(), 0);
        // Write entries survive for identity tracking; deletes drop out.
        assert_eq!(map.len(), 1);

        map.changes_applied(&changes);
        assert_eq!(map.pending_count(), 0);
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn failed_commit_leaves_changes_pending() {
        let mut map = DocumentMap::default();
        let storage = storage();
        let (a, pa) = note("a", "1");
        map.store(&storage, DocId::from("a"), Arc::new(a), pa);

        // No changes_applied call (commit failed): still pending.
        assert_eq!(map.pending_count(), 1);
        assert_eq!(map.pending_changes().len(), 1);
    }

    #[test]
    fn deleted_entry_reports_deleted() {
        let mut map = DocumentMap::default();
        let storage = storage();

        let (doc, payload) = note("n1", "x");
        map.loaded(&storage, DocId::from("n1"), doc, payload);
        map.mark_deleted::<Note>(&storage, DocId::from("n1"));

        assert!(map.is_deleted(&MapKey::of::<Note>(DocId::from("n1"))));
        let entry = map.entry(&MapKey::of::<Note>(DocId::from("n1"))).unwrap();
        assert!(entry.instance::<Note>().is_none());
    }
}
