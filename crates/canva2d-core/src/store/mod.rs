//! Document storage: the record model and the client seam for the remote store.

pub mod api;
mod file;
mod http;
mod memory;

pub use file::FileStore;
pub use http::HttpStore;
pub use memory::MemoryStore;

use crate::scene::Snapshot;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Storage errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("Invalid document id: {0:?}")]
    InvalidId(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Store error: {0}")]
    Other(String),
}

/// Result type for storage operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Boxed future returned by store operations.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Opaque document identifier, generated by the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    /// Fresh random id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Validate an id taken from a route or request path.
    /// Ids are non-empty and limited to `[A-Za-z0-9_-]`.
    pub fn parse(raw: &str) -> StoreResult<Self> {
        let valid = !raw.is_empty()
            && raw.len() <= 128
            && raw
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if valid {
            Ok(Self(raw.to_string()))
        } else {
            Err(StoreError::InvalidId(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for DocumentId {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// A persisted document record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: DocumentId,
    /// Last saved scene; `None` until the first save.
    pub scene: Option<Snapshot>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    /// A new, never-saved document.
    pub fn new(id: DocumentId, now: DateTime<Utc>) -> Self {
        Self {
            id,
            scene: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Merge a save into the record: replaces the scene, refreshes
    /// `updated_at`, keeps `created_at`.
    pub fn apply_save(&mut self, snapshot: Snapshot, now: DateTime<Utc>) {
        self.scene = Some(snapshot);
        self.updated_at = now;
    }

    /// The stored scene, treating an empty one as absent.
    pub fn snapshot(&self) -> Option<&Snapshot> {
        self.scene.as_ref().filter(|s| !s.is_empty())
    }
}

/// Client for a per-document key-value store.
///
/// No caching and no retries: each call is one attempt whose failure is
/// returned to the caller as-is.
pub trait DocumentStore: Send + Sync {
    /// Insert an empty document and return its generated id.
    fn create(&self) -> BoxFuture<'_, StoreResult<DocumentId>>;

    /// Upsert the document's scene and refresh `updatedAt`. Other fields are
    /// merged, never overwritten.
    fn save<'a>(
        &'a self,
        id: &'a DocumentId,
        snapshot: &'a Snapshot,
    ) -> BoxFuture<'a, StoreResult<()>>;

    /// Get the full record, or `None` if it does not exist.
    fn fetch<'a>(&'a self, id: &'a DocumentId) -> BoxFuture<'a, StoreResult<Option<Document>>>;

    /// List all document ids.
    fn list(&self) -> BoxFuture<'_, StoreResult<Vec<DocumentId>>>;

    /// Get the stored scene. Missing documents and documents without a
    /// (non-empty) scene both yield `None`.
    fn load<'a>(&'a self, id: &'a DocumentId) -> BoxFuture<'a, StoreResult<Option<Snapshot>>> {
        Box::pin(async move {
            let document = self.fetch(id).await?;
            if document.is_none() {
                log::warn!("Document {} not found", id);
            }
            Ok(document.and_then(|d| d.snapshot().cloned()))
        })
    }
}

/// Error parsing a [`StoreBackend`] string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown store backend {0:?} (expected memory, file, file:<path> or an http(s) URL)")]
pub struct StoreBackendError(pub String);

/// Which store implementation to use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    /// Process-local, lost on exit.
    Memory,
    /// JSON files in a directory (`None` = default data directory).
    File(Option<PathBuf>),
    /// Remote store served by `canva2d-server`.
    Http(String),
}

impl Default for StoreBackend {
    fn default() -> Self {
        StoreBackend::File(None)
    }
}

impl FromStr for StoreBackend {
    type Err = StoreBackendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s {
            "memory" => Ok(StoreBackend::Memory),
            "file" => Ok(StoreBackend::File(None)),
            _ if s.starts_with("http://") || s.starts_with("https://") => {
                Ok(StoreBackend::Http(s.to_string()))
            }
            _ => match s.strip_prefix("file:") {
                Some(path) if !path.is_empty() => Ok(StoreBackend::File(Some(PathBuf::from(path)))),
                _ => Err(StoreBackendError(s.to_string())),
            },
        }
    }
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreBackend::Memory => f.write_str("memory"),
            StoreBackend::File(None) => f.write_str("file"),
            StoreBackend::File(Some(path)) => write!(f, "file:{}", path.display()),
            StoreBackend::Http(url) => f.write_str(url),
        }
    }
}

impl StoreBackend {
    /// Construct the configured store.
    pub fn open(&self) -> StoreResult<Arc<dyn DocumentStore>> {
        let store: Arc<dyn DocumentStore> = match self {
            StoreBackend::Memory => Arc::new(MemoryStore::new()),
            StoreBackend::File(None) => Arc::new(FileStore::default_location()?),
            StoreBackend::File(Some(path)) => Arc::new(FileStore::new(path.clone())?),
            StoreBackend::Http(url) => Arc::new(HttpStore::new(url)?),
        };
        log::info!("Using {} document store", self);
        Ok(store)
    }
}
