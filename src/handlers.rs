use crate::mcp_server::{parse_request, McpServer};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Dispatcher for JSON-RPC messages.
    pub server: McpServer,
}

/// Health check endpoint.
///
/// Returns the service status and version.
pub async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<serde_json::Value>) {
    let info = state.server.info();
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": info.name,
            "version": info.version
        })),
    )
}

/// POST /mcp
///
/// Takes one JSON-RPC message. Requests are answered with a JSON-RPC
/// response body; notifications get `202 Accepted` and no body. Malformed
/// messages still get a JSON-RPC error, not an HTTP error.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `body` - Raw request body.
pub async fn mcp_post(State(state): State<Arc<AppState>>, body: String) -> Response {
    let response = match parse_request(&body) {
        Ok(request) => {
            tracing::debug!("POST /mcp - method: {}", request.method);
            match state.server.handle(request).await {
                Some(response) => response,
                None => return StatusCode::ACCEPTED.into_response(),
            }
        }
        Err(response) => response,
    };

    (StatusCode::OK, Json(response)).into_response()
}
