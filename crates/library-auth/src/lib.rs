//! Authentication core for the library catalog
//!
//! Credential storage is abstracted behind [`CredentialStore`]; this crate owns
//! password hashing, token issuance/validation and the registration and login
//! rules built on top of them.

pub mod accounts;
pub mod credentials;
pub mod jwt;
pub mod password;

pub use accounts::{
    normalize_username, AccountError, AccountService, Credentials, LoginOutcome, MAX_USERNAME_LEN,
};
pub use credentials::{Credential, CredentialStore, NewCredential, StoreError, DEFAULT_ROLE};
pub use jwt::{IssuedToken, TokenClaims, TokenError, TokenService, TokenSettings};
pub use password::{hash_password, verify_password, PasswordError};

// Re-export useful types
pub use async_trait::async_trait;
