use std::sync::Arc;

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use super::Registry;

/// 200 when every registered module is `Ready`, 503 otherwise.
pub async fn health(Extension(registry): Extension<Arc<Registry>>) -> impl IntoResponse {
    let statuses = registry.statuses();
    let healthy = statuses.iter().all(|s| s.state.is_ready());
    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(json!({
            "status": if healthy { "ok" } else { "degraded" },
            "modules": statuses,
        })),
    )
}

pub async fn modules(Extension(registry): Extension<Arc<Registry>>) -> impl IntoResponse {
    Json(json!({ "items": registry.statuses() }))
}
