use axum::Json;
use serde_json::{Value, json};

/// GET /healthz
/// Liveness only; dependencies are not probed
pub async fn healthz() -> Json<Value> {
    Json(json!({ "health": "ok" }))
}
