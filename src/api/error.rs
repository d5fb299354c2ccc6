//! API error type mapping repository and service failures onto HTTP statuses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::crypto::PasswordError;
use crate::db::repository::{MusicRepoError, UserRepoError};
use crate::db::social::SocialRepoError;
use crate::lastfm::{LastFmError, RefreshError};

/// API errors that can be returned to clients. Every variant renders as
/// `{"error": "..."}` JSON with the mapped status code.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("request failed: {self}");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<UserRepoError> for ApiError {
    fn from(err: UserRepoError) -> Self {
        match err {
            UserRepoError::NotFound(what) => ApiError::NotFound(what),
            UserRepoError::UsernameExists | UserRepoError::EmailExists => {
                ApiError::Conflict(err.to_string())
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<MusicRepoError> for ApiError {
    fn from(err: MusicRepoError) -> Self {
        match err {
            MusicRepoError::NotFound(what) => ApiError::NotFound(what),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<SocialRepoError> for ApiError {
    fn from(err: SocialRepoError) -> Self {
        match err {
            SocialRepoError::NotFound(what) => ApiError::NotFound(what),
            SocialRepoError::Conflict(what) => ApiError::Conflict(what),
            SocialRepoError::Validation(what) => ApiError::Validation(what),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<LastFmError> for ApiError {
    fn from(err: LastFmError) -> Self {
        match err {
            LastFmError::MissingApiKey => ApiError::Validation(err.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<RefreshError> for ApiError {
    fn from(err: RefreshError) -> Self {
        match err {
            RefreshError::Api(api) => ApiError::from(api),
            RefreshError::Storage(storage) => ApiError::from(storage),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::Validation("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::NotFound("x".into()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(ApiError::Conflict("x".into()).status(), StatusCode::CONFLICT);
        assert_eq!(
            ApiError::Internal("x".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_repo_errors_map_to_statuses() {
        let err: ApiError = SocialRepoError::Conflict("like already exists".into()).into();
        assert_eq!(err.status(), StatusCode::CONFLICT);

        let err: ApiError = UserRepoError::UsernameExists.into();
        assert_eq!(err.status(), StatusCode::CONFLICT);

        let err: ApiError = SocialRepoError::NotFound("song swap id 9".into()).into();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }
}
