//! Following endpoints.

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};

use super::resolve_user;
use crate::api::AppState;
use crate::api::error::ApiError;

fn default_limit() -> i64 {
    50
}

#[derive(Debug, Deserialize)]
pub struct FollowParams {
    #[serde(default)]
    pub follower: String,
    #[serde(default)]
    pub followee: String,
}

/// POST /api/user/follow
pub async fn follow(
    State(state): State<AppState>,
    Query(params): Query<FollowParams>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let follower = resolve_user(&state, &params.follower)?;
    let followee = resolve_user(&state, &params.followee)?;

    let following_id = state.follows.follow(follower.id, followee.id)?;
    Ok((StatusCode::CREATED, Json(json!({ "success": following_id }))))
}

/// POST /api/user/unfollow
pub async fn unfollow(
    State(state): State<AppState>,
    Query(params): Query<FollowParams>,
) -> Result<Json<Value>, ApiError> {
    let follower = resolve_user(&state, &params.follower)?;
    let followee = resolve_user(&state, &params.followee)?;

    state.follows.unfollow(follower.id, followee.id)?;
    Ok(Json(json!({ "success": true })))
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    pub user: String,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

/// GET /api/user/followers
pub async fn followers(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Value>, ApiError> {
    let user = resolve_user(&state, &params.user)?;
    let followers = state.follows.followers(user.id, params.limit)?;
    Ok(Json(json!({ "followers": followers })))
}

/// GET /api/user/following
pub async fn following(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Value>, ApiError> {
    let user = resolve_user(&state, &params.user)?;
    let following = state.follows.following(user.id, params.limit)?;
    Ok(Json(json!({ "following": following })))
}
