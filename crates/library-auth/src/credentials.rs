//! Credential storage seam
//!
//! Implementations persist (username, password hash, role) records and must
//! enforce uniqueness of the normalized username key themselves; the store's
//! constraint, not any prior lookup, decides a registration conflict.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

/// Role assigned to every registered user
pub const DEFAULT_ROLE: &str = "User";

/// A stored credential record
#[derive(Debug, Clone, PartialEq)]
pub struct Credential {
    pub id: Uuid,
    /// Trimmed username as submitted at registration
    pub username: String,
    /// Argon2id PHC hash
    pub password_hash: String,
    pub role: String,
}

/// A credential about to be inserted
#[derive(Debug, Clone, PartialEq)]
pub struct NewCredential {
    pub username: String,
    /// Lookup key (trimmed, lowercased), unique in the store
    pub username_key: String,
    pub password_hash: String,
    pub role: String,
}

#[derive(Debug, Error)]
pub enum StoreError {
    /// The username key is already taken
    #[error("Username already exists")]
    Duplicate,

    #[error("Credential store error: {0}")]
    Backend(String),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_by_username_key(&self, username_key: &str)
        -> Result<Option<Credential>, StoreError>;

    /// Insert a credential, returning [`StoreError::Duplicate`] when the
    /// username key violates the uniqueness constraint.
    async fn insert(&self, credential: NewCredential) -> Result<Credential, StoreError>;
}
