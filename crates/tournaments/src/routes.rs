use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use colosseum_core::{TeamId, TournamentId};
use colosseum_web::ApiError;

use crate::service::TournamentsService;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTournamentRequest {
    pub name: String,
    pub max_teams: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterTeamRequest {
    pub team_id: TeamId,
}

pub fn router(service: Arc<TournamentsService>) -> Router {
    Router::new()
        .route("/", post(create_tournament))
        .route("/:id", get(get_tournament))
        .route("/:id/entries", post(register_team))
        .layer(Extension(service))
}

async fn create_tournament(
    Extension(service): Extension<Arc<TournamentsService>>,
    Json(body): Json<CreateTournamentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let tournament = service.create(&body.name, body.max_teams)?;
    Ok((StatusCode::CREATED, Json(tournament)))
}

async fn get_tournament(
    Extension(service): Extension<Arc<TournamentsService>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id: TournamentId = id.parse()?;
    Ok(Json(service.get(id)?))
}

async fn register_team(
    Extension(service): Extension<Arc<TournamentsService>>,
    Path(id): Path<String>,
    Json(body): Json<RegisterTeamRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let id: TournamentId = id.parse()?;
    let tournament = service.register_team(id, body.team_id)?;
    Ok((StatusCode::CREATED, Json(tournament)))
}
