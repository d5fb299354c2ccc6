//! Listening data endpoints: per-user top lists and artist statistics.

use axum::Json;
use axum::extract::{Query, State};
use serde::Deserialize;
use serde_json::{Value, json};

use super::resolve_user;
use crate::api::AppState;
use crate::api::error::ApiError;

fn default_limit() -> i64 {
    10
}

fn default_period() -> String {
    "overall".to_string()
}

#[derive(Debug, Deserialize)]
pub struct TopListParams {
    #[serde(default)]
    pub user: String,
    #[serde(default = "default_period")]
    pub period: String,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn period_id(state: &AppState, period: &str) -> Result<i32, ApiError> {
    state
        .tops
        .period_id(period)?
        .ok_or_else(|| ApiError::Validation(format!("Unknown period: {period}")))
}

/// GET /api/user/top-artists
pub async fn top_artists(
    State(state): State<AppState>,
    Query(params): Query<TopListParams>,
) -> Result<Json<Value>, ApiError> {
    let user = resolve_user(&state, &params.user)?;
    let period = period_id(&state, &params.period)?;
    let artists = state.tops.top_artists(user.id, period, params.limit)?;
    Ok(Json(json!({ "topArtists": artists })))
}

/// GET /api/user/top-albums
pub async fn top_albums(
    State(state): State<AppState>,
    Query(params): Query<TopListParams>,
) -> Result<Json<Value>, ApiError> {
    let user = resolve_user(&state, &params.user)?;
    let period = period_id(&state, &params.period)?;
    let albums = state.tops.top_albums(user.id, period, params.limit)?;
    Ok(Json(json!({ "topAlbums": albums })))
}

/// GET /api/user/top-tracks
pub async fn top_tracks(
    State(state): State<AppState>,
    Query(params): Query<TopListParams>,
) -> Result<Json<Value>, ApiError> {
    let user = resolve_user(&state, &params.user)?;
    let period = period_id(&state, &params.period)?;
    let tracks = state.tops.top_tracks(user.id, period, params.limit)?;
    Ok(Json(json!({ "topTracks": tracks })))
}

#[derive(Debug, Deserialize)]
pub struct ListensParams {
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub artist: String,
    #[serde(default = "default_period")]
    pub period: String,
}

/// GET /api/artist/listens
pub async fn listens(
    State(state): State<AppState>,
    Query(params): Query<ListensParams>,
) -> Result<Json<Value>, ApiError> {
    if params.artist.trim().is_empty() {
        return Err(ApiError::Validation("Missing or invalid artist".into()));
    }
    let plays = state
        .tops
        .listens_for_artist(params.user.trim(), params.artist.trim(), &params.period)?;
    Ok(Json(json!({
        "user": params.user,
        "artist": params.artist,
        "period": params.period,
        "plays": plays,
    })))
}

#[derive(Debug, Deserialize)]
pub struct TopListenersParams {
    #[serde(default)]
    pub artist: String,
    #[serde(default = "default_period")]
    pub period: String,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

/// GET /api/artist/top-listeners
pub async fn top_listeners(
    State(state): State<AppState>,
    Query(params): Query<TopListenersParams>,
) -> Result<Json<Value>, ApiError> {
    if params.artist.trim().is_empty() {
        return Err(ApiError::Validation("Missing or invalid artist".into()));
    }
    let listeners = state.tops.top_listeners_for_artist(
        params.artist.trim(),
        &params.period,
        params.limit,
    )?;
    Ok(Json(json!({
        "artist": params.artist,
        "period": params.period,
        "topListeners": listeners,
    })))
}

#[derive(Debug, Deserialize)]
pub struct ArtistByIdParams {
    #[serde(default)]
    pub id: i32,
}

/// GET /api/artist/by-id
pub async fn artist_by_id(
    State(state): State<AppState>,
    Query(params): Query<ArtistByIdParams>,
) -> Result<Json<Value>, ApiError> {
    if params.id == 0 {
        return Err(ApiError::Validation("Missing or invalid artist ID".into()));
    }
    let artist = state
        .artists
        .find_by_id(params.id)?
        .ok_or_else(|| ApiError::NotFound("Artist not found".into()))?;
    Ok(Json(json!({
        "artist": { "id": artist.id, "name": artist.name },
    })))
}
