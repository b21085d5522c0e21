use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use colosseum_core::UserId;
use colosseum_web::ApiError;

use crate::service::IdentityService;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterUserRequest {
    pub username: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

pub fn router(service: Arc<IdentityService>) -> Router {
    Router::new()
        .route("/users", post(register_user))
        .route("/users/:id", get(get_user))
        .layer(Extension(service))
}

async fn register_user(
    Extension(service): Extension<Arc<IdentityService>>,
    Json(body): Json<RegisterUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = service.register(&body.username, body.display_name.as_deref())?;
    Ok((StatusCode::CREATED, Json(user)))
}

async fn get_user(
    Extension(service): Extension<Arc<IdentityService>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id: UserId = id.parse()?;
    Ok(Json(service.get(id)?))
}
