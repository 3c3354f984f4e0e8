//! In-memory document store.

use super::{BoxFuture, Document, DocumentId, DocumentStore, StoreError, StoreResult};
use crate::scene::Snapshot;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory store for tests and ephemeral use.
#[derive(Default)]
pub struct MemoryStore {
    documents: RwLock<HashMap<DocumentId, Document>>,
}

impl MemoryStore {
    /// Create a new empty memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock_error(e: impl std::fmt::Display) -> StoreError {
    StoreError::Other(format!("Lock error: {}", e))
}

impl DocumentStore for MemoryStore {
    fn create(&self) -> BoxFuture<'_, StoreResult<DocumentId>> {
        Box::pin(async move {
            let id = DocumentId::generate();
            let mut docs = self.documents.write().map_err(lock_error)?;
            docs.insert(id.clone(), Document::new(id.clone(), Utc::now()));
            log::debug!("Created document {}", id);
            Ok(id)
        })
    }

    fn save<'a>(
        &'a self,
        id: &'a DocumentId,
        snapshot: &'a Snapshot,
    ) -> BoxFuture<'a, StoreResult<()>> {
        Box::pin(async move {
            let now = Utc::now();
            let mut docs = self.documents.write().map_err(lock_error)?;
            docs.entry(id.clone())
                .or_insert_with(|| Document::new(id.clone(), now))
                .apply_save(snapshot.clone(), now);
            Ok(())
        })
    }

    fn fetch<'a>(&'a self, id: &'a DocumentId) -> BoxFuture<'a, StoreResult<Option<Document>>> {
        Box::pin(async move {
            let docs = self.documents.read().map_err(lock_error)?;
            Ok(docs.get(id).cloned())
        })
    }

    fn list(&self) -> BoxFuture<'_, StoreResult<Vec<DocumentId>>> {
        Box::pin(async move {
            let docs = self.documents.read().map_err(lock_error)?;
            let mut ids: Vec<_> = docs.keys().cloned().collect();
            ids.sort();
            Ok(ids)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pollster::block_on;

    #[test]
    fn test_create_then_fetch() {
        let store = MemoryStore::new();
        let id = block_on(store.create()).unwrap();

        let doc = block_on(store.fetch(&id)).unwrap().unwrap();
        assert_eq!(doc.id, id);
        assert!(doc.scene.is_none());
        assert_eq!(doc.created_at, doc.updated_at);
    }

    #[test]
    fn test_create_twice_gives_distinct_ids() {
        let store = MemoryStore::new();
        let a = block_on(store.create()).unwrap();
        let b = block_on(store.create()).unwrap();
        assert_ne!(a, b);
        assert_eq!(block_on(store.list()).unwrap().len(), 2);
    }

    #[test]
    fn test_save_and_load() {
        let store = MemoryStore::new();
        let id = block_on(store.create()).unwrap();
        let snapshot = Snapshot::new(r#"{"background":"x"}"#);

        block_on(store.save(&id, &snapshot)).unwrap();
        assert_eq!(block_on(store.load(&id)).unwrap(), Some(snapshot));
    }

    #[test]
    fn test_save_refreshes_updated_at_only() {
        let store = MemoryStore::new();
        let id = block_on(store.create()).unwrap();
        let before = block_on(store.fetch(&id)).unwrap().unwrap();

        std::thread::sleep(std::time::Duration::from_millis(5));
        block_on(store.save(&id, &Snapshot::new("{}"))).unwrap();
        let after = block_on(store.fetch(&id)).unwrap().unwrap();

        assert_eq!(after.created_at, before.created_at);
        assert!(after.updated_at > before.updated_at);
    }

    #[test]
    fn test_save_unknown_id_upserts() {
        let store = MemoryStore::new();
        let id = DocumentId::parse("never-created").unwrap();

        block_on(store.save(&id, &Snapshot::new("{}"))).unwrap();
        let doc = block_on(store.fetch(&id)).unwrap().unwrap();
        assert_eq!(doc.scene, Some(Snapshot::new("{}")));
        assert_eq!(doc.created_at, doc.updated_at);
    }

    #[test]
    fn test_load_missing_and_unsaved_are_none() {
        let store = MemoryStore::new();
        let missing = DocumentId::parse("missing").unwrap();
        assert_eq!(block_on(store.load(&missing)).unwrap(), None);

        let fresh = block_on(store.create()).unwrap();
        assert_eq!(block_on(store.load(&fresh)).unwrap(), None);
    }
}
