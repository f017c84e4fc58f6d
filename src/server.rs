use std::{net::SocketAddr, str::FromStr, sync::Arc};

use axum::{Extension, Router, routing::get};
use tokio::sync::Mutex;

use crate::{api, config::Config, types::PkceToken};

pub fn router(state: Arc<Mutex<Option<PkceToken>>>, config: Arc<Config>) -> Router {
    Router::new()
        .route("/health", get(api::health))
        .route("/callback", get(api::callback))
        .layer(Extension(state))
        .layer(Extension(config))
}

/// Serves the OAuth callback until the task is aborted.
pub async fn start_api_server(
    state: Arc<Mutex<Option<PkceToken>>>,
    config: Arc<Config>,
) -> Result<(), String> {
    let addr = SocketAddr::from_str(&config.server_addr)
        .map_err(|e| format!("Failed to parse server address: {}", e))?;

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| format!("Failed to bind {}: {}", addr, e))?;
    axum::serve(listener, router(state, config))
        .await
        .map_err(|e| e.to_string())
}
