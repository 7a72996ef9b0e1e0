use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

use crate::{
    auth::password::PasswordError,
    users::{
        repo::{RepoError, UniqueField},
        validate::ValidationError,
    },
};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    MalformedBody(String),

    #[error("{0} Already Taken")]
    Conflict(UniqueField),

    #[error("User Not Found")]
    NotFound,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("unknown account")]
    UnknownAccount,

    #[error("Incorrect Password")]
    IncorrectPassword,

    #[error("invalid user id: {0}")]
    BadRequest(String),

    #[error("storage error: {0}")]
    Storage(#[source] sqlx::Error),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Body of every failed response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::MalformedBody(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Unauthorized | ApiError::UnknownAccount | ApiError::IncorrectPassword => {
                StatusCode::UNAUTHORIZED
            }
            // kept at 500 for client compatibility
            ApiError::Conflict(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Storage(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Text sent to the client. Storage and internal details stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            ApiError::BadRequest(_) => "Invalid User ID".into(),
            ApiError::UnknownAccount | ApiError::Storage(_) | ApiError::Internal(_) => {
                "Incorrect Details".into()
            }
            other => other.to_string(),
        }
    }
}

impl From<RepoError> for ApiError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::Conflict(field) => ApiError::Conflict(field),
            RepoError::NotFound => ApiError::NotFound,
            RepoError::Storage(e) => ApiError::Storage(e),
            RepoError::Password(e) => ApiError::Internal(e.into()),
        }
    }
}

impl From<PasswordError> for ApiError {
    fn from(e: PasswordError) -> Self {
        match e {
            PasswordError::Mismatch => ApiError::IncorrectPassword,
            other => ApiError::Internal(other.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, %status, "request failed");
        } else {
            warn!(error = %self, %status, "request rejected");
        }
        let body = ErrorBody {
            error: self.public_message(),
        };
        (status, Json(body)).into_response()
    }
}
