use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use colosseum_core::{TeamId, UserId};
use colosseum_web::ApiError;

use crate::service::TeamsService;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTeamRequest {
    pub name: String,
    pub owner_id: UserId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddMemberRequest {
    pub user_id: UserId,
}

pub fn router(service: Arc<TeamsService>) -> Router {
    Router::new()
        .route("/", post(create_team).get(list_teams))
        .route("/:id", get(get_team))
        .route("/:id/members", post(add_member))
        .layer(Extension(service))
}

async fn create_team(
    Extension(service): Extension<Arc<TeamsService>>,
    Json(body): Json<CreateTeamRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let team = service.create_team(&body.name, body.owner_id)?;
    Ok((StatusCode::CREATED, Json(team)))
}

async fn list_teams(Extension(service): Extension<Arc<TeamsService>>) -> impl IntoResponse {
    Json(serde_json::json!({ "items": service.list() }))
}

async fn get_team(
    Extension(service): Extension<Arc<TeamsService>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id: TeamId = id.parse()?;
    Ok(Json(service.get(id)?))
}

async fn add_member(
    Extension(service): Extension<Arc<TeamsService>>,
    Path(id): Path<String>,
    Json(body): Json<AddMemberRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let id: TeamId = id.parse()?;
    let team = service.add_member(id, body.user_id)?;
    Ok((StatusCode::CREATED, Json(team)))
}
