use std::sync::Arc;

use anyhow::{Context as _, Result};
use axum::{
    Json, Router,
    extract::State,
    extract::ws::WebSocketUpgrade,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use super::origin::OriginPolicy;
use crate::config::HubConfig;
use crate::connection;
use crate::hub::HubHandle;

#[derive(Clone)]
pub struct AppState {
    pub hub: HubHandle,
    pub origins: Arc<OriginPolicy>,
}

/// HTTP routes: a banner, a health check and the WebSocket endpoint
pub fn router(hub: HubHandle, config: &HubConfig) -> Router {
    let state = AppState {
        hub,
        origins: Arc::new(OriginPolicy::from_config(config)),
    };

    Router::new()
        .route("/", get(|| async { "DX Hub" }))
        .route("/health", get(|| async { Json("OK") }))
        .route(&config.ws_path, get(ws_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve on an already bound listener
pub async fn serve_on(listener: TcpListener, config: HubConfig, hub: HubHandle) -> Result<()> {
    let addr = listener.local_addr()?;
    info!(%addr, path = %config.ws_path, "hub server listening");

    axum::serve(listener, router(hub, &config))
        .await
        .context("hub server failed")
}

async fn ws_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    if !state.origins.allows(&headers) {
        warn!(origin = ?headers.get(axum::http::header::ORIGIN), "rejecting cross-origin upgrade");
        return StatusCode::FORBIDDEN.into_response();
    }

    ws.on_upgrade(move |socket| async move {
        if let Err(err) = connection::serve(state.hub, socket).await {
            error!(error = %err, "unable to attach connection");
        }
    })
}
