//! Axum router wiring.
//!
//! Exposes `/healthz` and the metrics route; every route (and the 404
//! fallback) passes through the request-tracking middleware.

use axum::{middleware, routing::get, Router};

use crate::{app_state::AppState, obs, ops};

pub fn build_router(state: AppState) -> Router {
    let metrics_path = state.cfg().server.metrics_path.clone();
    Router::new()
        .route("/healthz", get(ops::healthz))
        .route(&metrics_path, get(ops::metrics))
        .fallback(ops::not_found)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            obs::http::track_requests,
        ))
        .with_state(state)
}
