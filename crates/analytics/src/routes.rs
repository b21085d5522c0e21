use std::sync::Arc;

use axum::{extract::Extension, response::IntoResponse, routing::get, Json, Router};

use crate::counters::EventCounters;

pub fn router(counters: Arc<EventCounters>) -> Router {
    Router::new()
        .route("/counters", get(counters_snapshot))
        .layer(Extension(counters))
}

async fn counters_snapshot(Extension(counters): Extension<Arc<EventCounters>>) -> impl IntoResponse {
    Json(counters.snapshot())
}
