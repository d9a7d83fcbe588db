//! Mapping of domain failures onto HTTP responses

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use library_auth::AccountError;
use sea_orm::DbErr;
use thiserror::Error;
use tracing::error;

use crate::models::ErrorResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or malformed input
    #[error("{0}")]
    Validation(String),

    /// Username already registered
    #[error("{0}")]
    Conflict(String),

    /// Bad credentials, or a missing/invalid bearer token
    #[error("{message}")]
    Unauthorized { message: String, code: &'static str },

    #[error("{0}")]
    NotFound(String),

    /// Detail is logged, never returned to the client
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn unauthorized(message: impl Into<String>, code: &'static str) -> Self {
        ApiError::Unauthorized {
            message: message.into(),
            code,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::Conflict(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "VALIDATION_ERROR",
            ApiError::Conflict(_) => "USERNAME_TAKEN",
            ApiError::Unauthorized { code, .. } => *code,
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = match &self {
            ApiError::Internal(detail) => {
                error!("Internal error: {}", detail);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = ErrorResponse {
            message,
            code: Some(self.code().to_string()),
        };

        (self.status(), Json(body)).into_response()
    }
}

impl From<AccountError> for ApiError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::Validation(msg) => ApiError::Validation(msg),
            AccountError::Conflict => ApiError::Conflict(err.to_string()),
            AccountError::InvalidCredentials => {
                ApiError::unauthorized(err.to_string(), "INVALID_CREDENTIALS")
            }
            AccountError::Internal(detail) => ApiError::Internal(detail),
        }
    }
}

impl From<DbErr> for ApiError {
    fn from(err: DbErr) -> Self {
        ApiError::Internal(format!("Database error: {}", err))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(format!("Invalid request body: {}", rejection.body_text()))
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::Validation(format!("Invalid path: {}", rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::Validation(format!("Invalid query string: {}", rejection.body_text()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_of(err: ApiError) -> (StatusCode, ErrorResponse) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_account_errors_map_to_status_codes() {
        let (status, body) = body_of(AccountError::Conflict.into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.code.as_deref(), Some("USERNAME_TAKEN"));

        let (status, body) = body_of(AccountError::InvalidCredentials.into()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body.message, "Invalid username or password");
        assert_eq!(body.code.as_deref(), Some("INVALID_CREDENTIALS"));

        let (status, body) =
            body_of(AccountError::Validation("Username and password are required".into()).into())
                .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.message, "Username and password are required");
    }

    #[tokio::test]
    async fn test_internal_error_detail_is_not_exposed() {
        let (status, body) =
            body_of(ApiError::Internal("connection refused at 10.0.0.5".to_string())).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.message, "Internal server error");
        assert_eq!(body.code.as_deref(), Some("INTERNAL_ERROR"));
    }
}
