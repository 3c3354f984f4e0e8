//! File-based document store.

use super::{BoxFuture, Document, DocumentId, DocumentStore, StoreError, StoreResult};
use crate::scene::Snapshot;
use chrono::Utc;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Stores one JSON record per document in a directory.
pub struct FileStore {
    base_path: PathBuf,
}

impl FileStore {
    /// Create a file store rooted at `base_path`, creating the directory if needed.
    pub fn new(base_path: PathBuf) -> StoreResult<Self> {
        if !base_path.exists() {
            fs::create_dir_all(&base_path).map_err(|e| {
                StoreError::Io(format!("Failed to create storage directory: {}", e))
            })?;
        }
        Ok(Self { base_path })
    }

    /// File store in the platform data directory
    /// (e.g. `~/.local/share/canva2d/documents/`).
    pub fn default_location() -> StoreResult<Self> {
        let base = dirs::data_local_dir()
            .or_else(dirs::home_dir)
            .ok_or_else(|| StoreError::Io("Could not determine home directory".to_string()))?;
        Self::new(base.join("canva2d").join("documents"))
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Ids are validated on construction, so they are already filename-safe.
    fn document_path(&self, id: &DocumentId) -> PathBuf {
        self.base_path.join(format!("{}.json", id))
    }

    fn read(path: &Path) -> StoreResult<Option<Document>> {
        let json = match fs::read_to_string(path) {
            Ok(json) => json,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(StoreError::Io(format!(
                    "Failed to read {}: {}",
                    path.display(),
                    e
                )));
            }
        };
        serde_json::from_str(&json).map(Some).map_err(|e| {
            StoreError::Serialization(format!("Failed to parse {}: {}", path.display(), e))
        })
    }

    /// Write into a temporary file next to the record, then rename it over
    /// the record so readers see either the old or the new version.
    fn write(path: &Path, document: &Document) -> StoreResult<()> {
        let json = serde_json::to_vec_pretty(document)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        let io_error =
            |e: io::Error| StoreError::Io(format!("Failed to write {}: {}", path.display(), e));
        let dir = path.parent().unwrap_or_else(|| Path::new("."));

        let mut file = NamedTempFile::new_in(dir).map_err(io_error)?;
        file.write_all(&json).map_err(io_error)?;
        file.persist(path).map_err(|e| io_error(e.error))?;
        Ok(())
    }
}

impl DocumentStore for FileStore {
    fn create(&self) -> BoxFuture<'_, StoreResult<DocumentId>> {
        Box::pin(async move {
            let id = DocumentId::generate();
            Self::write(&self.document_path(&id), &Document::new(id.clone(), Utc::now()))?;
            log::debug!("Created document {} in {}", id, self.base_path.display());
            Ok(id)
        })
    }

    fn save<'a>(
        &'a self,
        id: &'a DocumentId,
        snapshot: &'a Snapshot,
    ) -> BoxFuture<'a, StoreResult<()>> {
        Box::pin(async move {
            let path = self.document_path(id);
            let now = Utc::now();
            let mut document = Self::read(&path)?.unwrap_or_else(|| Document::new(id.clone(), now));
            document.apply_save(snapshot.clone(), now);
            Self::write(&path, &document)
        })
    }

    fn fetch<'a>(&'a self, id: &'a DocumentId) -> BoxFuture<'a, StoreResult<Option<Document>>> {
        Box::pin(async move { Self::read(&self.document_path(id)) })
    }

    fn list(&self) -> BoxFuture<'_, StoreResult<Vec<DocumentId>>> {
        Box::pin(async move {
            let entries = fs::read_dir(&self.base_path)
                .map_err(|e| StoreError::Io(format!("Failed to read directory: {}", e)))?;

            let mut ids: Vec<DocumentId> = entries
                .flatten()
                .map(|entry| entry.path())
                .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
                .filter_map(|path| {
                    let stem = path.file_stem()?.to_str()?;
                    DocumentId::parse(stem).ok()
                })
                .collect();
            ids.sort();
            Ok(ids)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pollster::block_on;
    use tempfile::tempdir;

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path().to_path_buf()).unwrap();
        let id = block_on(store.create()).unwrap();
        let snapshot = Snapshot::new(r#"{"shapes":{}}"#);

        block_on(store.save(&id, &snapshot)).unwrap();
        assert_eq!(block_on(store.load(&id)).unwrap(), Some(snapshot));
        assert!(dir.path().join(format!("{}.json", id)).exists());
    }

    #[test]
    fn test_creates_missing_directory() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let store = FileStore::new(nested.clone()).unwrap();
        assert_eq!(store.base_path(), nested.as_path());
        assert!(nested.is_dir());
    }

    #[test]
    fn test_record_survives_reopen() {
        let dir = tempdir().unwrap();
        let id = {
            let store = FileStore::new(dir.path().to_path_buf()).unwrap();
            let id = block_on(store.create()).unwrap();
            block_on(store.save(&id, &Snapshot::new("{}"))).unwrap();
            id
        };

        let reopened = FileStore::new(dir.path().to_path_buf()).unwrap();
        let doc = block_on(reopened.fetch(&id)).unwrap().unwrap();
        assert_eq!(doc.scene, Some(Snapshot::new("{}")));
        assert!(doc.updated_at >= doc.created_at);
    }

    #[test]
    fn test_save_keeps_created_at() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path().to_path_buf()).unwrap();
        let id = block_on(store.create()).unwrap();
        let created = block_on(store.fetch(&id)).unwrap().unwrap().created_at;

        block_on(store.save(&id, &Snapshot::new("{}"))).unwrap();
        block_on(store.save(&id, &Snapshot::new(r#"{"a":1}"#))).unwrap();

        let doc = block_on(store.fetch(&id)).unwrap().unwrap();
        assert_eq!(doc.created_at, created);
        assert_eq!(doc.scene, Some(Snapshot::new(r#"{"a":1}"#)));
    }

    #[test]
    fn test_missing_is_none() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path().to_path_buf()).unwrap();
        let id = DocumentId::parse("nope").unwrap();
        assert!(block_on(store.fetch(&id)).unwrap().is_none());
        assert!(block_on(store.load(&id)).unwrap().is_none());
    }

    #[test]
    fn test_corrupt_record_is_serialization_error() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path().to_path_buf()).unwrap();
        std::fs::write(dir.path().join("broken.json"), "not json").unwrap();

        let id = DocumentId::parse("broken").unwrap();
        assert!(matches!(
            block_on(store.fetch(&id)),
            Err(StoreError::Serialization(_))
        ));
    }

    #[test]
    fn test_load_during_saves_never_sees_partial_record() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path().to_path_buf()).unwrap();
        let id = block_on(store.create()).unwrap();
        let big = Snapshot::new(format!(r#"{{"pad":"{}"}}"#, "x".repeat(256 * 1024)));
        block_on(store.save(&id, &big)).unwrap();

        std::thread::scope(|scope| {
            scope.spawn(|| {
                for _ in 0..50 {
                    block_on(store.save(&id, &big)).unwrap();
                }
            });
            for _ in 0..500 {
                assert_eq!(block_on(store.load(&id)).unwrap(), Some(big.clone()));
            }
        });

        // No temporary files are left behind
        assert_eq!(block_on(store.list()).unwrap(), vec![id]);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_list_only_json_records() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path().to_path_buf()).unwrap();
        let a = block_on(store.create()).unwrap();
        let b = block_on(store.create()).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "x").unwrap();

        let ids = block_on(store.list()).unwrap();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&a));
        assert!(ids.contains(&b));
    }
}
