//! HTTP error replies.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use log::error;
use thiserror::Error;

use crate::auth::AuthError;
use crate::common::messages::ErrorResponse;
use crate::store::error::StoreError;

/// Error returned by a handler, rendered as `{"detail": ...}`.
///
/// `Internal` carries the underlying error text verbatim, so remote and
/// storage failures are visible to the caller as-is.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        (
            status,
            Json(ErrorResponse {
                detail: self.to_string(),
            }),
        )
            .into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::InvalidInput(_) | AuthError::EmailTaken => Self::BadRequest(e.to_string()),
            AuthError::InvalidCredentials => Self::Unauthorized(e.to_string()),
            AuthError::Hashing(_) | AuthError::Store(_) => {
                error!("❌ Account operation failed: {}", e);
                Self::Internal(e.to_string())
            }
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        error!("❌ Record store failure: {}", e);
        Self::Internal(e.to_string())
    }
}
