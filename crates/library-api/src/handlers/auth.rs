use axum::{extract::rejection::JsonRejection, extract::State, Extension, Json};
use std::sync::Arc;
use tracing::debug;

use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::models::*;
use crate::AppState;

/// Register a new user
///
/// No token is issued; the client logs in separately.
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "User registered", body = RegisterResponse),
        (status = 400, description = "Missing fields or username already taken", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn register(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Json<RegisterResponse>, ApiError> {
    let Json(req) = payload?;

    state.accounts.register(req.into()).await?;

    Ok(Json(RegisterResponse {
        message: "User registered successfully".to_string(),
    }))
}

/// Log in and receive a bearer token
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 400, description = "Missing fields", body = ErrorResponse),
        (status = 401, description = "Invalid username or password", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let Json(req) = payload?;

    let outcome = state.accounts.login(req.into()).await?;

    Ok(Json(LoginResponse {
        token: outcome.token,
        username: outcome.user.username,
        role: outcome.user.role,
        expires_at: outcome.expires_at,
    }))
}

/// Get the authenticated user
#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Current user", body = AuthUser),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
pub async fn get_current_user(Extension(user): Extension<AuthUser>) -> Json<AuthUser> {
    debug!("Current user requested: {}", user.user_id);
    Json(user)
}
