//! Remote document store client speaking to `canva2d-server`.

use super::api::{self, CreatedResponse, ErrorBody, ListResponse, SaveRequest};
use super::{BoxFuture, Document, DocumentId, DocumentStore, StoreError, StoreResult};
use crate::scene::Snapshot;
use reqwest::StatusCode;
use std::time::Duration;

/// Per-request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

impl From<reqwest::Error> for StoreError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            StoreError::Serialization(e.to_string())
        } else {
            StoreError::Transport(e.to_string())
        }
    }
}

/// HTTP client for a remote document store.
pub struct HttpStore {
    client: reqwest::Client,
    base_url: String,
}

impl HttpStore {
    /// Create a client for the server at `base_url`, e.g. `http://localhost:3030`.
    pub fn new(base_url: &str) -> StoreResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self::with_client(client, base_url))
    }

    /// Create a client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Turn a non-2xx response into [`StoreError::Rejected`].
    async fn ensure_success(response: reqwest::Response) -> StoreResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());
        Err(rejection(status, &body))
    }
}

fn rejection(status: StatusCode, body: &str) -> StoreError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .map(|b| b.error)
        .unwrap_or_else(|_| body.to_string());
    StoreError::Rejected {
        status: status.as_u16(),
        message,
    }
}

impl DocumentStore for HttpStore {
    fn create(&self) -> BoxFuture<'_, StoreResult<DocumentId>> {
        Box::pin(async move {
            let response = self
                .client
                .post(self.url(api::DOCUMENTS_PATH))
                .send()
                .await?;
            let created: CreatedResponse = Self::ensure_success(response).await?.json().await?;
            Ok(created.id)
        })
    }

    fn save<'a>(
        &'a self,
        id: &'a DocumentId,
        snapshot: &'a Snapshot,
    ) -> BoxFuture<'a, StoreResult<()>> {
        Box::pin(async move {
            let body = SaveRequest {
                scene: snapshot.clone(),
            };
            let response = self
                .client
                .put(self.url(&api::scene_path(id)))
                .json(&body)
                .send()
                .await?;
            Self::ensure_success(response).await?;
            Ok(())
        })
    }

    fn fetch<'a>(&'a self, id: &'a DocumentId) -> BoxFuture<'a, StoreResult<Option<Document>>> {
        Box::pin(async move {
            let response = self
                .client
                .get(self.url(&api::document_path(id)))
                .send()
                .await?;
            if response.status() == StatusCode::NOT_FOUND {
                return Ok(None);
            }
            let document: Document = Self::ensure_success(response).await?.json().await?;
            Ok(Some(document))
        })
    }

    fn list(&self) -> BoxFuture<'_, StoreResult<Vec<DocumentId>>> {
        Box::pin(async move {
            let response = self
                .client
                .get(self.url(api::DOCUMENTS_PATH))
                .send()
                .await?;
            let list: ListResponse = Self::ensure_success(response).await?.json().await?;
            Ok(list.documents)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_slash_is_trimmed() {
        let store = HttpStore::new("http://localhost:3030/").unwrap();
        assert_eq!(store.base_url(), "http://localhost:3030");
        assert_eq!(
            store.url(api::DOCUMENTS_PATH),
            "http://localhost:3030/api/documents"
        );
    }

    #[test]
    fn test_rejection_prefers_error_body() {
        let err = rejection(StatusCode::BAD_REQUEST, r#"{"error":"bad id"}"#);
        match err {
            StoreError::Rejected { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "bad id");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_rejection_falls_back_to_raw_body() {
        let err = rejection(StatusCode::BAD_GATEWAY, "upstream down");
        assert_eq!(err.to_string(), "Request rejected (502): upstream down");
    }

    #[test]
    fn test_unreachable_server_is_transport_error() {
        let store = HttpStore::new("http://127.0.0.1:1").unwrap();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let result = runtime.block_on(store.create());
        assert!(matches!(result, Err(StoreError::Transport(_))));
    }
}
