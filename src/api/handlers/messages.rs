//! Direct message endpoints.

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
pub struct SendMessageParams {
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub recipient: String,
    #[serde(default)]
    pub message: String,
}

/// POST /api/send-direct-message
pub async fn send_direct_message(
    State(state): State<AppState>,
    Query(params): Query<SendMessageParams>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let sender = resolve_user(&state, &params.user)?;
    let recipient = resolve_user(&state, &params.recipient)?;
    if params.message.trim().is_empty() {
        return Err(ApiError::Validation("message is required".into()));
    }

    let message_id = state
        .messages
        .send(sender.id, recipient.id, &params.message)?;
    Ok((StatusCode::CREATED, Json(json!({ "success": message_id }))))
}

#[derive(Debug, Deserialize)]
pub struct ConversationsParams {
    #[serde(default)]
    pub user: String,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

/// GET /api/user/conversations
pub async fn conversations(
    State(state): State<AppState>,
    Query(params): Query<ConversationsParams>,
) -> Result<Json<Value>, ApiError> {
    let user = resolve_user(&state, &params.user)?;
    let conversations = state.messages.conversations(user.id, params.limit)?;
    Ok(Json(json!({ "conversations": conversations })))
}

#[derive(Debug, Deserialize)]
pub struct ThreadParams {
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub conversant: String,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

/// GET /api/user/direct-messages
pub async fn direct_messages(
    State(state): State<AppState>,
    Query(params): Query<ThreadParams>,
) -> Result<Json<Value>, ApiError> {
    let user = resolve_user(&state, &params.user)?;
    let conversant = resolve_user(&state, &params.conversant)?;

    let messages = state.messages.thread(user.id, conversant.id, params.limit)?;
    Ok(Json(json!({ "directMessages": messages })))
}

#[derive(Debug, Deserialize)]
pub struct MarkReadParams {
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub recipient: String,
}

/// POST /api/mark-messages-read
///
/// Marks everything `user` sent to `recipient` as read.
pub async fn mark_messages_read(
    State(state): State<AppState>,
    Query(params): Query<MarkReadParams>,
) -> Result<Json<Value>, ApiError> {
    let sender = resolve_user(&state, &params.user)?;
    let recipient = resolve_user(&state, &params.recipient)?;

    let marked = state.messages.mark_read(sender.id, recipient.id)?;
    Ok(Json(json!({ "success": true, "marked": marked })))
}
