use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use colosseum_core::UserId;
use colosseum_web::ApiError;

use crate::inbox::NotificationCenter;

pub fn router(center: Arc<NotificationCenter>) -> Router {
    Router::new()
        .route("/:user_id", get(inbox))
        .layer(Extension(center))
}

async fn inbox(
    Extension(center): Extension<Arc<NotificationCenter>>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id: UserId = user_id.parse()?;
    Ok(Json(serde_json::json!({ "items": center.inbox(user_id) })))
}
