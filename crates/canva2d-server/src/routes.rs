//! REST routes for the document store.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use canva2d_core::store::api::{CreatedResponse, ErrorBody, ListResponse, SaveRequest};
use canva2d_core::store::{Document, DocumentId, DocumentStore, StoreError};
use std::sync::Arc;
use thiserror::Error;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
}

/// Handler errors, rendered as `{"error": "..."}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("Document {0} not found")]
    NotFound(DocumentId),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) | ApiError::Store(StoreError::InvalidId(_)) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Store(e) => {
                error!(error = %e, "Store error");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let body = ErrorBody {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

/// Build the application router.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/documents", post(create_document).get(list_documents))
        .route("/api/documents/{id}", get(get_document))
        .route("/api/documents/{id}/scene", put(save_scene))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check
async fn health() -> &'static str {
    "ok"
}

/// `POST /api/documents`: insert an empty document.
async fn create_document(
    State(state): State<AppState>,
) -> ApiResult<(StatusCode, Json<CreatedResponse>)> {
    let id = state.store.create().await?;
    info!(%id, "Document created");
    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

/// `GET /api/documents`
async fn list_documents(State(state): State<AppState>) -> ApiResult<Json<ListResponse>> {
    let documents = state.store.list().await?;
    Ok(Json(ListResponse { documents }))
}

/// `GET /api/documents/{id}`: the full record.
async fn get_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Document>> {
    let id = DocumentId::parse(&id)?;
    let document = state.store.fetch(&id).await?;
    document.map(Json).ok_or(ApiError::NotFound(id))
}

/// `PUT /api/documents/{id}/scene`: upsert the scene, keeping `createdAt`.
async fn save_scene(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<SaveRequest>, JsonRejection>,
) -> ApiResult<StatusCode> {
    let id = DocumentId::parse(&id)?;
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    state.store.save(&id, &request.scene).await?;
    info!(%id, bytes = request.scene.as_str().len(), "Scene saved");
    Ok(StatusCode::NO_CONTENT)
}
