//! Operational HTTP endpoints.
//!
//! - `/healthz` : liveness
//! - `/metrics` : text exposition (path configurable)

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

use crate::app_state::AppState;

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

/// Render the registry. A render failure is a failed scrape (500), never a crash.
pub async fn metrics(State(state): State<AppState>) -> Response {
    let registry = state.registry();
    match registry.render() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, registry.content_type())],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, code = e.code().as_str(), "metrics render failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

pub async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "not found")
}
