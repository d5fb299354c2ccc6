//! User profile endpoints: lookup, registration, login, password reset, swag.

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::warn;

use super::resolve_user;
use crate::api::AppState;
use crate::api::error::ApiError;
use crate::crypto::hash_password;
use crate::db::repository::NewUser;
use crate::models::social::RelatedKind;
use crate::models::user::UserProfileView;

#[derive(Debug, Deserialize)]
pub struct ProfileParams {
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub partial: bool,
}

/// GET /api/user/profile
///
/// Exact lookup by default; `partial=true` searches for the term anywhere in
/// the profile name, capped at 10 results.
pub async fn profile(
    State(state): State<AppState>,
    Query(params): Query<ProfileParams>,
) -> Result<Json<Value>, ApiError> {
    let term = params.user.trim();
    if term.is_empty() {
        return Err(ApiError::Validation("Missing user parameter".into()));
    }

    let matches = state.users.search_profiles(term, params.partial, 10)?;
    if matches.is_empty() && !params.partial {
        return Err(ApiError::NotFound(format!("No profile named {term}")));
    }

    let profiles: Vec<UserProfileView> = matches.iter().map(UserProfileView::from).collect();
    Ok(Json(json!({ "userProfile": profiles })))
}

#[derive(Debug, Deserialize)]
pub struct CreateProfileParams {
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub firstname: String,
    #[serde(default)]
    pub lastname: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub bootstrapped: i32,
}

/// POST /api/user/create-profile
pub async fn create_profile(
    State(state): State<AppState>,
    Query(params): Query<CreateProfileParams>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let username = params.user.trim();
    if username.is_empty() {
        return Err(ApiError::Validation("Missing or invalid user".into()));
    }
    if params.firstname.trim().is_empty() {
        return Err(ApiError::Validation("first name is required".into()));
    }
    if params.lastname.trim().is_empty() {
        return Err(ApiError::Validation("last name is required".into()));
    }
    if params.email.trim().is_empty() {
        return Err(ApiError::Validation("email is required".into()));
    }
    if params.password.trim().is_empty() {
        return Err(ApiError::Validation("password is required".into()));
    }

    let password_hash = hash_password(&params.password)?;
    let user = state.users.create(&NewUser::new(
        username,
        params.firstname.trim(),
        params.lastname.trim(),
        params.email.trim(),
        &password_hash,
        params.bootstrapped != 0,
    ))?;

    let profile_url = format!("https://www.last.fm/user/{username}");
    state
        .users
        .set_profile_urls(user.id, Some(&profile_url), None)?;

    // Pull their listening history. A signup should not fail because the
    // scrobbling API is down or unconfigured.
    match state.refresher() {
        Ok(refresher) => {
            if let Err(e) = refresher.refresh_user(user.id, username).await {
                warn!(username, "initial listening refresh failed: {e}");
            }
        }
        Err(e) => warn!(username, "initial listening refresh skipped: {e}"),
    }

    state.broadcasts.create_system(
        "New Broadcastr",
        &format!("{username} has joined Broadcastr. Welcome {username}!"),
        RelatedKind::User,
        user.id,
    )?;

    Ok((StatusCode::CREATED, Json(json!({ "success": user.id }))))
}

#[derive(Debug, Deserialize)]
pub struct LoginParams {
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub password: String,
}

/// POST /api/user/login
///
/// Verifies the password, bumps `last_login`, and refreshes listening data
/// when it has gone stale.
pub async fn login(
    State(state): State<AppState>,
    Query(params): Query<LoginParams>,
) -> Result<Json<Value>, ApiError> {
    let user = resolve_user(&state, &params.user)?;
    // The system account has no password hash and can never log in.
    if user.is_system() || !user.verify_password(&params.password) {
        return Err(ApiError::Validation("Invalid password".into()));
    }

    state.users.touch_last_login(user.id)?;

    if state.tops.refresh_due(user.id)? {
        match state.refresher() {
            Ok(refresher) => {
                if let Err(e) = refresher.refresh_user(user.id, &user.username).await {
                    warn!(username = %user.username, "listening refresh failed: {e}");
                }
            }
            Err(e) => warn!(username = %user.username, "listening refresh skipped: {e}"),
        }
    }

    Ok(Json(json!({ "success": true })))
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordParams {
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub oldpassword: String,
    #[serde(default)]
    pub newpassword: String,
}

/// POST /api/user/reset-password
pub async fn reset_password(
    State(state): State<AppState>,
    Query(params): Query<ResetPasswordParams>,
) -> Result<Json<Value>, ApiError> {
    let user = resolve_user(&state, &params.user)?;
    if params.newpassword.trim().is_empty() {
        return Err(ApiError::Validation("new password is required".into()));
    }
    if user.is_system() || !user.verify_password(&params.oldpassword) {
        return Err(ApiError::Validation("Invalid password".into()));
    }

    let password_hash = hash_password(&params.newpassword)?;
    state.users.update_password(user.id, &password_hash)?;

    Ok(Json(json!({ "success": "password successfully updated" })))
}

#[derive(Debug, Deserialize)]
pub struct AddSwagParams {
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub swag: i32,
}

/// POST /api/user/add-swag
pub async fn add_swag(
    State(state): State<AppState>,
    Query(params): Query<AddSwagParams>,
) -> Result<Json<Value>, ApiError> {
    let user = resolve_user(&state, &params.user)?;
    let balance = state.users.add_swag(user.id, params.swag)?;
    Ok(Json(json!({ "swag": balance })))
}
