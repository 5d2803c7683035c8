//! Auth token endpoints
//!
//! Exchange the seeded credentials for a bearer token, and let clients
//! check whether a stored token is still good.

use super::{respond, RequireAuth, API_PREFIX};
use crate::error::{ApiError, ApiResult};
use crate::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use vril_common::{auth, Envelope};

/// POST /auth-token body
#[derive(Debug, Deserialize)]
pub struct CreateTokenRequest {
    pub username: String,
    pub password: String,
}

/// POST /api/v1/auth-token
pub async fn create_auth_token(
    State(state): State<AppState>,
    payload: Result<Json<CreateTokenRequest>, JsonRejection>,
) -> Response {
    let mut res = Envelope::new();

    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            res.set_error(format!("Invalid request body: {}", rejection), 400);
            return respond(res, state.debug);
        }
    };

    match issue_token(&state, &request).await {
        Ok(token) => {
            res.add_data("auth_token", token);
        }
        Err(e) => {
            res.set_error(e.to_string(), e.status());
        }
    }

    respond(res, state.debug)
}

async fn issue_token(state: &AppState, request: &CreateTokenRequest) -> ApiResult<String> {
    if request.username.trim().is_empty() || request.password.is_empty() {
        return Err(ApiError::BadRequest(
            "Username and password are required".to_string(),
        ));
    }

    auth::verify_credentials(&state.db, &request.username, &request.password).await?;

    let token = auth::issue_token(&state.db, &request.username).await?;

    Ok(token)
}

/// GET /api/v1/auth-token/validate
///
/// Reaching the handler at all means the extractor accepted the token.
pub async fn validate_auth_token(
    State(state): State<AppState>,
    RequireAuth(username): RequireAuth,
) -> Response {
    let mut res = Envelope::new();
    res.add_data("valid", true).add_data("username", username);

    respond(res, state.debug)
}

/// Build auth routes
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route(&format!("{}/auth-token", API_PREFIX), post(create_auth_token))
        .route(
            &format!("{}/auth-token/validate", API_PREFIX),
            get(validate_auth_token),
        )
}
