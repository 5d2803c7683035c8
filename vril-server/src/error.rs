//! API error type
//!
//! Every failure that reaches the transport layer is converted to the
//! response envelope; clients never see a bare stack trace or an empty
//! 500 body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use vril_common::Envelope;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Missing or invalid credentials (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated but not allowed (403)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Resource not found (404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// Shared-layer error, mapped through its own status
    #[error(transparent)]
    Common(#[from] vril_common::Error),

    /// Pipeline failure, tagged with the stage that died
    #[error(transparent)]
    Ingest(#[from] crate::ingest::IngestError),
}

impl ApiError {
    /// HTTP status code for this error
    pub fn status(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::Unauthorized(_) => 401,
            ApiError::Forbidden(_) => 403,
            ApiError::NotFound(_) => 404,
            ApiError::Internal(_) => 500,
            ApiError::Common(e) => e.status(),
            ApiError::Ingest(_) => 500,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let mut envelope = Envelope::new();
        envelope.set_error(self.to_string(), status);
        let (status, body) = envelope.package(false);

        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
