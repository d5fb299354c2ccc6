//! Like endpoints.

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};

use super::{resolve_kind, resolve_user};
use crate::api::AppState;
use crate::api::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct LikeParams {
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub relatedtype: String,
    #[serde(default)]
    pub relatedid: i32,
}

/// POST /api/create-like
pub async fn create_like(
    State(state): State<AppState>,
    Query(params): Query<LikeParams>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let user = resolve_user(&state, &params.user)?;
    let kind = resolve_kind(&params.relatedtype)?;
    if params.relatedid == 0 {
        return Err(ApiError::Validation("Missing or invalid related id".into()));
    }

    let like_id = state.likes.create(user.id, kind, params.relatedid)?;
    Ok((StatusCode::CREATED, Json(json!({ "success": like_id }))))
}

/// POST /api/undo-like
pub async fn undo_like(
    State(state): State<AppState>,
    Query(params): Query<LikeParams>,
) -> Result<Json<Value>, ApiError> {
    let user = resolve_user(&state, &params.user)?;
    let kind = resolve_kind(&params.relatedtype)?;
    if params.relatedid == 0 {
        return Err(ApiError::Validation("Missing or invalid related id".into()));
    }

    state.likes.remove(user.id, kind, params.relatedid)?;
    Ok(Json(json!({ "success": true })))
}

/// GET /api/get-likes
pub async fn get_likes(
    State(state): State<AppState>,
    Query(params): Query<LikeParams>,
) -> Result<Json<Value>, ApiError> {
    let user = resolve_user(&state, &params.user)?;
    let kind = resolve_kind(&params.relatedtype)?;
    if params.relatedid == 0 {
        return Err(ApiError::Validation("Missing or invalid related id".into()));
    }

    let like_id = state.likes.find(user.id, kind, params.relatedid)?;
    Ok(Json(json!({
        "liked": like_id.is_some(),
        "like_id": like_id,
    })))
}
