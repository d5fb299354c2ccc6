//! API endpoint handlers.

pub mod broadcasts;
pub mod following;
pub mod likes;
pub mod listening;
pub mod messages;
pub mod profiles;
pub mod song_swaps;

use crate::api::AppState;
use crate::api::error::ApiError;
use crate::models::User;
use crate::models::social::RelatedKind;

/// Resolve a profile name to its user, failing the request when the name is
/// blank or unknown.
pub(crate) fn resolve_user(state: &AppState, name: &str) -> Result<User, ApiError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ApiError::Validation("Missing or invalid user".into()));
    }
    state
        .users
        .find_by_username(name)?
        .ok_or_else(|| ApiError::NotFound(format!("No profile named {name}")))
}

/// Resolve a related-kind name, failing the request when it is unknown.
pub(crate) fn resolve_kind(name: &str) -> Result<RelatedKind, ApiError> {
    RelatedKind::from_name(name)
        .ok_or_else(|| ApiError::Validation("Missing or invalid related type".into()))
}
