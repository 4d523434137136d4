//! HTTP listener for script execution
//!
//! `GET /` describes the service; `POST /` and `POST /code` execute the
//! script in the JSON body.

use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use logicbox_common::{ScriptResponse, ServiceInfo};
use logicbox_sandbox::SandboxService;
use std::sync::Arc;
use tracing::{debug, info};

/// Shared state for the HTTP listener
#[derive(Clone)]
pub struct HttpServerState {
    service: Arc<SandboxService>,
}

impl HttpServerState {
    pub fn new(service: Arc<SandboxService>) -> Self {
        Self { service }
    }
}

/// Create the router, rejecting bodies above `max_body_bytes`
pub fn create_router(state: HttpServerState, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/", get(handle_info).post(handle_execute))
        .route("/code", axum::routing::post(handle_execute))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .with_state(state)
}

/// Serve until the listener fails
pub async fn start_server(
    listener: tokio::net::TcpListener,
    state: HttpServerState,
    max_body_bytes: usize,
) -> Result<()> {
    let app = create_router(state, max_body_bytes);

    let bind_addr = listener
        .local_addr()
        .context("Failed to obtain HTTP server bind address")?;
    info!("Starting HTTP server on {}", bind_addr);

    axum::serve(listener, app)
        .await
        .context("HTTP server error")?;

    Ok(())
}

async fn handle_info(State(state): State<HttpServerState>) -> Json<ServiceInfo> {
    Json(state.service.service_info().clone())
}

async fn handle_execute(
    State(state): State<HttpServerState>,
    body: Bytes,
) -> (StatusCode, Json<ScriptResponse>) {
    debug!(body_len = body.len(), "Received execution request");
    let response = state.service.handle_body(&body).await;
    let status = StatusCode::from_u16(crate::status_code(&response))
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(response))
}
