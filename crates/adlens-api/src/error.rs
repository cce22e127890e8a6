//! HTTP error response conversion
//!
//! Every handler returns `Result<impl IntoResponse, ApiError>`. Domain
//! errors from the storage and provider crates convert into [`ApiError`]
//! through the `From` impls here, so status codes, the response body
//! shape, and logging stay consistent across the API surface.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use adlens_services::ProviderError;
use adlens_storage::{BlobStorageError, TokenError};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

/// Wire shape of every error response: `{"error": message}`.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Error)]
pub enum ApiError {
    /// User-correctable request problem (400).
    #[error("{0}")]
    Validation(String),

    /// Missing, invalid, or expired upload token (401).
    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    PayloadTooLarge(String),

    /// Upstream provider failure; the provider's message is surfaced (500).
    #[error("{0}")]
    Provider(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Provider(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_type(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "validation",
            ApiError::Unauthorized(_) => "unauthorized",
            ApiError::NotFound(_) => "not_found",
            ApiError::PayloadTooLarge(_) => "payload_too_large",
            ApiError::Provider(_) => "provider",
            ApiError::Internal(_) => "internal",
        }
    }
}

fn log_error(error: &ApiError) {
    let error_type = error.error_type();
    if error.status_code().is_server_error() {
        tracing::error!(error = %error, error_type = error_type, "Request failed");
    } else {
        tracing::warn!(error = %error, error_type = error_type, "Request rejected");
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        log_error(&self);
        let body = Json(ErrorResponse {
            error: self.to_string(),
        });
        (self.status_code(), body).into_response()
    }
}

// Convert domain errors to ApiError (avoids orphan rule: we impl for local ApiError)

impl From<ProviderError> for ApiError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::UnsupportedMediaType(_) => {
                ApiError::Validation("File must be a video or image".to_string())
            }
            other => ApiError::Provider(other.to_string()),
        }
    }
}

impl From<BlobStorageError> for ApiError {
    fn from(err: BlobStorageError) -> Self {
        match err {
            BlobStorageError::NotFound(_) => ApiError::NotFound("Blob not found".to_string()),
            BlobStorageError::InvalidPathname(msg) => ApiError::Validation(msg),
            BlobStorageError::WriteFailed(msg)
            | BlobStorageError::ReadFailed(msg)
            | BlobStorageError::Config(msg) => ApiError::Internal(msg),
            BlobStorageError::Io(err) => ApiError::Internal(format!("IO error: {}", err)),
        }
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Malformed | TokenError::SignatureMismatch | TokenError::Expired => {
                ApiError::Unauthorized(err.to_string())
            }
            TokenError::Crypto(msg) => ApiError::Internal(msg),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Internal(err.to_string())
    }
}
