use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use registry::StoreError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Incorrect current password")]
    IncorrectPassword,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateUsername(_) => AppError::Conflict(err.to_string()),
            StoreError::InvalidUpload(reason) => AppError::MalformedPayload(reason),
            other => AppError::InternalError(other.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::MalformedPayload { .. } => StatusCode::BAD_REQUEST,
            AppError::InvalidCredentials | AppError::IncorrectPassword => StatusCode::UNAUTHORIZED,
            AppError::Forbidden { .. } => StatusCode::FORBIDDEN,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Conflict { .. } => StatusCode::CONFLICT,
            AppError::InternalError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            error!("{self}");
        }

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid {key} value: {reason}")]
    Invalid { key: String, reason: String },

    #[error("{0} must be configured in production")]
    MissingSecret(String),
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Signing key rejected: {0}")]
    Key(String),

    #[error("Claims could not be encoded: {0}")]
    Encode(#[from] serde_json::Error),
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        AppError::InternalError(err.to_string())
    }
}
