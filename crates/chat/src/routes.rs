use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use colosseum_core::{ChannelId, TeamId, UserId};
use colosseum_web::ApiError;

use crate::service::ChatService;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub sender_id: UserId,
    pub body: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

pub fn router(service: Arc<ChatService>) -> Router {
    Router::new()
        .route("/teams/:team_id/channel", get(team_channel))
        .route("/channels/:id/messages", get(list_messages).post(send_message))
        .layer(Extension(service))
}

async fn team_channel(
    Extension(service): Extension<Arc<ChatService>>,
    Path(team_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let team_id: TeamId = team_id.parse()?;
    Ok(Json(service.channel_for_team(team_id)?))
}

async fn send_message(
    Extension(service): Extension<Arc<ChatService>>,
    Path(id): Path<String>,
    Json(body): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let id: ChannelId = id.parse()?;
    let message = service.send_message(id, body.sender_id, &body.body)?;
    Ok((StatusCode::CREATED, Json(message)))
}

async fn list_messages(
    Extension(service): Extension<Arc<ChatService>>,
    Path(id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let id: ChannelId = id.parse()?;
    let items = service.messages(id, query.limit)?;
    Ok(Json(serde_json::json!({ "items": items })))
}
