//! The axum router.

use crate::{http, state::Gateway, ws};
use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use fcore::RouteInfo;
use serde_json::{Value, json};

/// Build the router: health probes, route introspection, and one
/// `/{name}` path per function (`POST` for HTTP, `GET` for WebSocket).
pub fn router(state: Gateway) -> Router {
    Router::new()
        .route("/healthz", get(health))
        .route("/dry_run", get(health))
        .route("/routes", get(routes))
        .route("/{name}", post(http::invoke).get(ws::upgrade))
        .fallback(|| async { http::not_found() })
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn routes(State(state): State<Gateway>) -> Json<Vec<RouteInfo>> {
    Json(state.registry.routes().map(|route| route.info()).collect())
}
