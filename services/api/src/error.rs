//! Custom error types for the API service
//!
//! Every handler forwards failures here; `IntoResponse` is the single place
//! mapping an error kind to an HTTP status and a minimal JSON body. Missing
//! entities and ownership violations are reported identically so a caller
//! cannot probe for existence.

use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Custom error type for the API service
#[derive(Error, Debug)]
pub enum ApiError {
    /// Malformed or missing input
    #[error("{0}")]
    Validation(String),

    /// Bad credentials or token
    #[error("{0}")]
    Auth(String),

    /// Missing or not-owned entity
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Metadata store write failure
    #[error("persistence error: {0}")]
    Persistence(#[source] sqlx::Error),

    /// Local scratch storage failure
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Remote object store failure
    #[error("object store error: {0}")]
    Upload(String),

    /// Anything else that should never reach the caller verbatim
    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Auth(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::NotFound(entity) => (StatusCode::NOT_FOUND, format!("{} not found", entity)),
            ApiError::Persistence(ref source) => {
                tracing::error!("Persistence error: {}", source);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            ApiError::Io(ref source) => {
                tracing::error!("IO error: {}", source);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            ApiError::Upload(ref msg) => {
                tracing::error!("Object store error: {}", msg);
                (
                    StatusCode::BAD_GATEWAY,
                    "Object store error".to_string(),
                )
            }
            ApiError::Internal(ref msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        ApiError::Persistence(err)
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        ApiError::Validation(format!("invalid multipart body: {}", err))
    }
}

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;
