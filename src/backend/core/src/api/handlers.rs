//! Request handlers.

use axum::{
    extract::State,
    http::{header, Method, StatusCode, Uri},
    response::IntoResponse,
    Json,
};

use super::AppState;
use crate::authz::AuthorizedRequest;

// ═══════════════════════════════════════════════════════════════════════════════
// Operational Handlers
// ═══════════════════════════════════════════════════════════════════════════════

pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "engine": state.authorizer.engine_name(),
    }))
}

pub async fn prometheus_metrics(State(state): State<AppState>) -> impl IntoResponse {
    match state.metrics.render() {
        Some(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Authorized Fallback
// ═══════════════════════════════════════════════════════════════════════════════

/// Echo the authorization outcome for any request that got past the gate.
pub async fn echo_authorized(
    authorized: AuthorizedRequest,
    method: Method,
    uri: Uri,
) -> impl IntoResponse {
    Json(serde_json::json!({
        "success": true,
        "data": {
            "method": method.as_str(),
            "path": uri.path(),
            "authorization": authorized,
        }
    }))
}
