//! Registration and login

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::credentials::{Credential, CredentialStore, NewCredential, StoreError, DEFAULT_ROLE};
use crate::jwt::{TokenError, TokenService};
use crate::password::{hash_password, verify_password, PasswordError};

const CREDENTIALS_REQUIRED: &str = "Username and password are required";

/// Width of the `username` and `username_key` columns
pub const MAX_USERNAME_LEN: usize = 255;

/// Username and password as submitted by a client
#[derive(Clone, Default, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Both fields must contain something other than whitespace, and the
    /// stored username and its lookup key must fit their columns
    fn validate(&self) -> Result<(), AccountError> {
        if self.username.trim().is_empty() || self.password.trim().is_empty() {
            return Err(AccountError::Validation(CREDENTIALS_REQUIRED.to_string()));
        }
        // Lowercasing can grow a string, so the key is checked separately.
        if self.username.trim().len() > MAX_USERNAME_LEN
            || normalize_username(&self.username).len() > MAX_USERNAME_LEN
        {
            return Err(AccountError::Validation(format!(
                "Username must be at most {} bytes",
                MAX_USERNAME_LEN
            )));
        }
        Ok(())
    }
}

/// Key used for case-insensitive username matching
pub fn normalize_username(username: &str) -> String {
    username.trim().to_lowercase()
}

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("{0}")]
    Validation(String),

    #[error("User already exists")]
    Conflict,

    /// Unknown user and wrong password are deliberately indistinguishable
    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for AccountError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate => AccountError::Conflict,
            StoreError::Backend(msg) => AccountError::Internal(msg),
        }
    }
}

impl From<PasswordError> for AccountError {
    fn from(err: PasswordError) -> Self {
        AccountError::Internal(err.to_string())
    }
}

impl From<TokenError> for AccountError {
    fn from(err: TokenError) -> Self {
        AccountError::Internal(err.to_string())
    }
}

/// Result of a successful login
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: Credential,
}

pub struct AccountService {
    store: Arc<dyn CredentialStore>,
    tokens: Arc<TokenService>,
    // Verified against when the username is unknown so both failure paths
    // do the same amount of hashing work.
    dummy_hash: String,
}

impl AccountService {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        tokens: Arc<TokenService>,
    ) -> Result<Self, AccountError> {
        let dummy_hash = hash_password("library-catalog-dummy-password")?;

        Ok(Self {
            store,
            tokens,
            dummy_hash,
        })
    }

    pub fn tokens(&self) -> &Arc<TokenService> {
        &self.tokens
    }

    /// Create a credential with the default role. No token is issued.
    pub async fn register(&self, credentials: Credentials) -> Result<Credential, AccountError> {
        credentials.validate()?;

        let username = credentials.username.trim().to_string();
        let username_key = normalize_username(&username);

        if self
            .store
            .find_by_username_key(&username_key)
            .await?
            .is_some()
        {
            return Err(AccountError::Conflict);
        }

        let password_hash = hash_blocking(credentials.password).await?;

        let user = self
            .store
            .insert(NewCredential {
                username,
                username_key,
                password_hash,
                role: DEFAULT_ROLE.to_string(),
            })
            .await?;

        info!(user_id = %user.id, username = %user.username, "User registered");

        Ok(user)
    }

    pub async fn login(&self, credentials: Credentials) -> Result<LoginOutcome, AccountError> {
        credentials.validate()?;

        let username_key = normalize_username(&credentials.username);
        let stored = self.store.find_by_username_key(&username_key).await?;

        let Some(user) = stored else {
            // Result ignored; the unknown-user path must cost a verification too.
            let _ = verify_blocking(credentials.password, self.dummy_hash.clone()).await;
            warn!(username = %username_key, "Failed login attempt");
            return Err(AccountError::InvalidCredentials);
        };

        if !verify_blocking(credentials.password, user.password_hash.clone()).await? {
            warn!(username = %username_key, "Failed login attempt");
            return Err(AccountError::InvalidCredentials);
        }

        let issued = self.tokens.issue(&user)?;

        info!(user_id = %user.id, username = %user.username, "Login successful");

        Ok(LoginOutcome {
            expires_at: issued.expires_at(),
            token: issued.token,
            user,
        })
    }
}

async fn hash_blocking(password: String) -> Result<String, AccountError> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AccountError::Internal(format!("hashing task failed: {}", e)))?
        .map_err(AccountError::from)
}

async fn verify_blocking(password: String, hash: String) -> Result<bool, AccountError> {
    tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| AccountError::Internal(format!("verification task failed: {}", e)))?
        .map_err(AccountError::from)
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}
