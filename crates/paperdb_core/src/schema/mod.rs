//! Schema resolution: document type to physical storage shape.

mod mapping;
mod storage;

pub use mapping::Mapping;
pub use storage::DocumentStorage;

use crate::document::Document;
use parking_lot::RwLock;
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

/// Resolves document types to their storage shape and command builders.
///
/// Resolution happens once per type: the first lookup derives the default
/// [`Mapping`] from the [`Document`] contract (or uses a registered
/// override) and caches both the mapping and its [`DocumentStorage`].
/// Subsequent lookups are lock-read-and-clone.
#[derive(Debug, Default)]
pub struct SchemaProvider {
    mappings: RwLock<HashMap<TypeId, Arc<Mapping>>>,
    storages: RwLock<HashMap<TypeId, Arc<DocumentStorage>>>,
}

impl SchemaProvider {
    /// Creates an empty provider.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a customized mapping for a document type.
    ///
    /// Replaces any previously resolved mapping and invalidates the cached
    /// command builders for the type. Call before sessions touch the type.
    pub fn register<T: Document>(&self, mapping: Mapping) {
        let type_id = TypeId::of::<T>();
        self.mappings.write().insert(type_id, Arc::new(mapping));
        self.storages.write().remove(&type_id);
    }

    /// Returns the mapping for a document type, resolving it on first use.
    pub fn mapping<T: Document>(&self) -> Arc<Mapping> {
        let type_id = TypeId::of::<T>();
        if let Some(mapping) = self.mappings.read().get(&type_id) {
            return Arc::clone(mapping);
        }
        let mapping = Arc::new(Mapping::for_document::<T>());
        self.mappings
            .write()
            .entry(type_id)
            .or_insert_with(|| Arc::clone(&mapping))
            .clone()
    }

    /// Returns the command builders for a document type.
    pub fn storage<T: Document>(&self) -> Arc<DocumentStorage> {
        let type_id = TypeId::of::<T>();
        if let Some(storage) = self.storages.read().get(&type_id) {
            return Arc::clone(storage);
        }
        let storage = Arc::new(DocumentStorage::new(self.mapping::<T>()));
        self.storages
            .write()
            .entry(type_id)
            .or_insert_with(|| Arc::clone(&storage))
            .clone()
    }
}
