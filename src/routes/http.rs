// GET handlers: health, version

use axum::response::IntoResponse;

use crate::version::{NAME, VERSION};

/// GET /health: liveness of this process only; does not touch the store.
pub(super) async fn health_handler() -> impl IntoResponse {
    axum::Json(serde_json::json!({ "status": "ok" }))
}

/// GET /version: service name and version (from Cargo.toml at build time).
pub(super) async fn version_handler() -> impl IntoResponse {
    axum::Json(serde_json::json!({
        "name": NAME,
        "version": VERSION,
    }))
}
