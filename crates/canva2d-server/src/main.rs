//! Canva2D Document Server
//!
//! Stores canvas documents and serves them over a small REST API:
//!
//! ```text
//! POST /api/documents              -> 201 {"id": "..."}
//! GET  /api/documents              -> 200 {"documents": ["...", ...]}
//! GET  /api/documents/{id}         -> 200 {"id", "scene", "createdAt", "updatedAt"} | 404
//! PUT  /api/documents/{id}/scene   -> 204   body: {"scene": "..."}
//! GET  /health                     -> 200 ok
//! ```

mod config;
mod routes;

use config::ServerConfig;
use routes::AppState;
use std::process::ExitCode;
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "canva2d_server=info,canva2d_core=info,tower_http=info".into()),
        )
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = ServerConfig::from_env()?;
    let store = config.store.open()?;
    let app = routes::app(AppState { store });

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    info!("Canva2D document server listening on {}", config.addr);
    info!("Store: {}", config.store);

    axum::serve(listener, app).await?;
    Ok(())
}
