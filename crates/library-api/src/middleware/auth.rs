//! Bearer token authentication middleware
//!
//! Extracts the token from the `Authorization` header, validates it, and makes
//! the caller's identity available to handlers via Axum's Extension.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use library_auth::TokenService;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::ApiError;

/// Authenticated user context extracted from the token
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub username: String,
    pub role: String,
}

/// Token validation state shared across middleware instances
#[derive(Clone)]
pub struct JwtState {
    pub tokens: Arc<TokenService>,
}

impl JwtState {
    pub fn new(tokens: Arc<TokenService>) -> Self {
        Self { tokens }
    }
}

/// Split `Bearer <token>`, accepting any casing of the scheme
fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Authentication middleware for protected routes
///
/// # Errors
/// Returns 401 Unauthorized if:
/// - The Authorization header is missing (`MISSING_AUTH`)
/// - It is not of the form `Bearer <token>` (`INVALID_AUTH_FORMAT`)
/// - The token fails signature, issuer, audience or expiry checks (`INVALID_TOKEN`)
pub async fn require_auth(
    State(state): State<Arc<JwtState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .ok_or_else(|| ApiError::unauthorized("Missing Authorization header", "MISSING_AUTH"))?;

    let token = auth_header
        .to_str()
        .ok()
        .and_then(bearer_token)
        .ok_or_else(|| {
            ApiError::unauthorized(
                "Invalid Authorization header format. Expected 'Bearer <token>'",
                "INVALID_AUTH_FORMAT",
            )
        })?;

    let claims = state.tokens.validate(token).map_err(|e| {
        debug!("Rejected bearer token: {}", e);
        ApiError::unauthorized("Invalid or expired token", "INVALID_TOKEN")
    })?;

    let user_id = Uuid::parse_str(&claims.sub)
        .map_err(|_| ApiError::unauthorized("Invalid or expired token", "INVALID_TOKEN"))?;

    request.extensions_mut().insert(AuthUser {
        user_id,
        username: claims.username,
        role: claims.role,
    });

    Ok(next.run(request).await)
}
