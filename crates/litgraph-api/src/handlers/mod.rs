//! HTTP handlers for litgraph-api.

pub mod maintenance;
pub mod search;
pub mod works;

use axum::Json;
use serde_json::{json, Value as JsonValue};

/// Liveness probe.
pub async fn health_check() -> Json<JsonValue> {
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
