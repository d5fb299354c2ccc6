//! Broadcast endpoints.

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};

use super::{resolve_kind, resolve_user};
use crate::api::AppState;
use crate::api::error::ApiError;

fn default_limit() -> i64 {
    50
}

#[derive(Debug, Deserialize)]
pub struct CreateBroadcastParams {
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub relatedtype: String,
    #[serde(default)]
    pub relatedid: i32,
}

/// POST /api/create-broadcast
pub async fn create_broadcast(
    State(state): State<AppState>,
    Query(params): Query<CreateBroadcastParams>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let user = resolve_user(&state, &params.user)?;
    let kind = resolve_kind(&params.relatedtype)?;
    if params.title.trim().is_empty() && params.body.trim().is_empty() {
        return Err(ApiError::Validation("title or body is required".into()));
    }

    let broadcast_id = state.broadcasts.create(
        user.id,
        &params.title,
        &params.body,
        kind,
        params.relatedid,
    )?;
    Ok((StatusCode::CREATED, Json(json!({ "success": broadcast_id }))))
}

#[derive(Debug, Deserialize)]
pub struct DeleteBroadcastParams {
    #[serde(default)]
    pub id: i32,
}

/// POST /api/delete-broadcast
pub async fn delete_broadcast(
    State(state): State<AppState>,
    Query(params): Query<DeleteBroadcastParams>,
) -> Result<Json<Value>, ApiError> {
    if params.id == 0 {
        return Err(ApiError::Validation("Missing or invalid broadcast id".into()));
    }
    state.broadcasts.delete(params.id)?;
    Ok(Json(json!({ "success": true })))
}

#[derive(Debug, Deserialize)]
pub struct GetBroadcastsParams {
    #[serde(default)]
    pub user: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub current_user: String,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

/// GET /api/get-broadcasts
pub async fn get_broadcasts(
    State(state): State<AppState>,
    Query(params): Query<GetBroadcastsParams>,
) -> Result<Json<Value>, ApiError> {
    let author_id = if params.user.trim().is_empty() {
        None
    } else {
        Some(resolve_user(&state, &params.user)?.id)
    };
    let kind = if params.kind.trim().is_empty() {
        None
    } else {
        Some(resolve_kind(&params.kind)?)
    };
    let viewer_id = if params.current_user.trim().is_empty() {
        None
    } else {
        Some(resolve_user(&state, &params.current_user)?.id)
    };

    let broadcasts = state.broadcasts.feed(viewer_id, author_id, kind, params.limit)?;
    Ok(Json(json!({ "broadcasts": broadcasts })))
}

#[derive(Debug, Deserialize)]
pub struct TopBroadcastedTracksParams {
    #[serde(default)]
    pub user: String,
    #[serde(default = "default_top_limit")]
    pub limit: i64,
}

fn default_top_limit() -> i64 {
    10
}

/// GET /api/user/top-broadcasted-tracks
pub async fn top_broadcasted_tracks(
    State(state): State<AppState>,
    Query(params): Query<TopBroadcastedTracksParams>,
) -> Result<Json<Value>, ApiError> {
    let user = resolve_user(&state, &params.user)?;
    let tracks = state
        .broadcasts
        .top_broadcasted_tracks(user.id, params.limit)?;
    Ok(Json(json!({ "topTracks": tracks })))
}
