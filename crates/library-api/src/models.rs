//! API request and response models

use chrono::{DateTime, Utc};
use library_auth::Credentials;
use library_db::entities::book;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Service version
    pub version: String,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Human-readable error message
    pub message: String,
    /// Machine-readable error code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

// ============================================================================
// Authentication Models
// ============================================================================

/// User registration request
///
/// Missing fields deserialize as empty strings and are rejected by validation.
#[derive(Clone, Serialize, Deserialize, ToSchema)]
pub struct RegisterRequest {
    /// Desired username (trimmed, unique case-insensitively)
    #[serde(default)]
    pub username: String,
    /// Password
    #[serde(default)]
    pub password: String,
}

impl From<RegisterRequest> for Credentials {
    fn from(req: RegisterRequest) -> Self {
        Credentials::new(req.username, req.password)
    }
}

/// User registration response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RegisterResponse {
    pub message: String,
}

/// User login request
#[derive(Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl From<LoginRequest> for Credentials {
    fn from(req: LoginRequest) -> Self {
        Credentials::new(req.username, req.password)
    }
}

/// User login response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    /// Bearer token for the `Authorization` header
    pub token: String,
    pub username: String,
    pub role: String,
    /// Token expiration timestamp
    pub expires_at: DateTime<Utc>,
}

// ============================================================================
// Book Models
// ============================================================================

/// A book in the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub author: String,
    pub description: String,
    /// Category or genre (e.g. Fiction, Science, Biography)
    pub category: String,
}

impl From<book::Model> for Book {
    fn from(model: book::Model) -> Self {
        Self {
            id: model.id,
            title: model.title,
            author: model.author,
            description: model.description,
            category: model.category,
        }
    }
}

/// Create book request
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct CreateBookRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
}

/// Update book request
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateBookRequest {
    /// Must equal the id in the path when present
    #[serde(default)]
    pub id: Option<i32>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
}

/// Query parameters for listing books
#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct BookQuery {
    /// Exact category match
    pub category: Option<String>,
    /// Substring of title or author
    pub search: Option<String>,
}

/// Title and author are required for every stored book
pub(crate) fn validate_book_fields(title: &str, author: &str) -> Result<(), String> {
    if title.trim().is_empty() {
        return Err("Title is required".to_string());
    }
    if author.trim().is_empty() {
        return Err("Author is required".to_string());
    }
    Ok(())
}
