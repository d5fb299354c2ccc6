//! Song swap endpoints.

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

fn default_autotitle() -> i32 {
    1
}

#[derive(Debug, Deserialize)]
pub struct InitiateParams {
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub matched_user: String,
}

/// POST /api/initiate-song-swap
///
/// The counterpart is optional; without one a random recently-active user is
/// drawn.
pub async fn initiate_song_swap(
    State(state): State<AppState>,
    Query(params): Query<InitiateParams>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let user = resolve_user(&state, &params.user)?;
    let matched_id = if params.matched_user.trim().is_empty() {
        None
    } else {
        Some(resolve_user(&state, &params.matched_user)?.id)
    };

    let (swap_id, matched_user_id) = state.swaps.initiate(user.id, matched_id)?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "song_swap_id": swap_id,
            "matched_user_id": matched_user_id,
        })),
    ))
}

#[derive(Debug, Deserialize)]
pub struct AddTrackParams {
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub songswapid: i32,
    #[serde(default)]
    pub trackid: i32,
}

/// POST /api/add-song-swap-track
///
/// The caller's role (initiated or matched) is inferred from the swap itself.
pub async fn add_song_swap_track(
    State(state): State<AppState>,
    Query(params): Query<AddTrackParams>,
) -> Result<Json<Value>, ApiError> {
    let user = resolve_user(&state, &params.user)?;
    if params.songswapid == 0 {
        return Err(ApiError::Validation("Missing or invalid song swap id".into()));
    }
    if params.trackid == 0 {
        return Err(ApiError::Validation("Missing or invalid track id".into()));
    }

    state
        .swaps
        .submit_track(params.songswapid, user.id, params.trackid)?;
    Ok(Json(json!({ "success": true })))
}

#[derive(Debug, Deserialize)]
pub struct AddReactionParams {
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub songswapid: i32,
    #[serde(default)]
    pub reaction: i32,
    #[serde(default = "default_autotitle")]
    pub autotitle: i32,
}

/// POST /api/add-song-swap-reaction
pub async fn add_song_swap_reaction(
    State(state): State<AppState>,
    Query(params): Query<AddReactionParams>,
) -> Result<Json<Value>, ApiError> {
    let user = resolve_user(&state, &params.user)?;
    if params.songswapid == 0 {
        return Err(ApiError::Validation("Missing or invalid song swap id".into()));
    }

    state.swaps.submit_reaction(
        params.songswapid,
        user.id,
        params.reaction,
        params.autotitle == 1,
    )?;
    Ok(Json(json!({ "success": true })))
}

#[derive(Debug, Deserialize)]
pub struct GetSwapsParams {
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub songswapid: i32,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

/// GET /api/get-song-swaps
pub async fn get_song_swaps(
    State(state): State<AppState>,
    Query(params): Query<GetSwapsParams>,
) -> Result<Json<Value>, ApiError> {
    let user_id = if params.user.trim().is_empty() {
        None
    } else {
        Some(resolve_user(&state, &params.user)?.id)
    };
    let swap_id = (params.songswapid != 0).then_some(params.songswapid);

    let swaps = state.swaps.list(user_id, swap_id, params.limit)?;
    Ok(Json(json!({ "songSwaps": swaps })))
}
