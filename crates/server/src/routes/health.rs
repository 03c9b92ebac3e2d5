use axum::{Extension, Json};
use serde_json::{json, Value as JsonValue};

use crate::state::SharedState;

/// GET /health
pub async fn health_check(Extension(state): Extension<SharedState>) -> Json<JsonValue> {
    Json(json!({
        "status": "ok",
        "games": state.len().await,
    }))
}
