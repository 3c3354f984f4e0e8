//! Request and response bodies shared by `HttpStore` and `canva2d-server`.

use super::DocumentId;
use crate::scene::Snapshot;
use serde::{Deserialize, Serialize};

/// Route prefix for the documents collection.
pub const DOCUMENTS_PATH: &str = "/api/documents";

/// Body of `201 Created` for `POST /api/documents`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatedResponse {
    pub id: DocumentId,
}

/// Body of `PUT /api/documents/{id}/scene`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveRequest {
    pub scene: Snapshot,
}

/// Body of `GET /api/documents`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ListResponse {
    pub documents: Vec<DocumentId>,
}

/// Body of every non-2xx response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Path of a single document.
pub fn document_path(id: &DocumentId) -> String {
    format!("{}/{}", DOCUMENTS_PATH, id)
}

/// Path of a document's scene field.
pub fn scene_path(id: &DocumentId) -> String {
    format!("{}/{}/scene", DOCUMENTS_PATH, id)
}
