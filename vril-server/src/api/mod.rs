//! REST API handlers
//!
//! Routes live under `/api/v1`. Read endpoints are public and cached;
//! write endpoints require a bearer token. Every response goes through
//! the envelope, including extractor rejections.

pub mod articles;
pub mod auth;
pub mod health;
pub mod movies;
pub mod params;

pub use articles::article_routes;
pub use auth::auth_routes;
pub use health::health_routes;
pub use movies::movie_routes;

use crate::error::ApiError;
use crate::AppState;
use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use vril_common::Envelope;

pub const API_PREFIX: &str = "/api/v1";

/// Package an envelope into an HTTP response
pub fn respond(envelope: Envelope, debug: bool) -> Response {
    let (status, body) = envelope.package(debug);
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    (status, Json(body)).into_response()
}

/// Bearer-token auth extractor for write endpoints
///
/// Carries the authenticated username. Missing/garbage tokens reject
/// with 401, expired tokens with 403, both as envelope bodies.
pub struct RequireAuth(pub String);

#[async_trait]
impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("Missing Authorization header".to_string()))?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError::Unauthorized("Expected Bearer token".to_string()))?;

        let username = vril_common::auth::validate_token(&state.db, token)
            .await
            .map_err(|e| match e {
                vril_common::Error::Forbidden(message) => ApiError::Forbidden(message),
                vril_common::Error::Auth(message) => ApiError::Unauthorized(message),
                other => ApiError::Common(other),
            })?;

        Ok(RequireAuth(username))
    }
}
