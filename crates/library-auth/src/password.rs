//! Password hashing and verification using Argon2id

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use thiserror::Error;

/// Error types for password operations
#[derive(Error, Debug)]
pub enum PasswordError {
    /// Failed to hash password
    #[error("Failed to hash password: {0}")]
    HashingFailed(String),

    /// Failed to verify password
    #[error("Failed to verify password: {0}")]
    VerificationFailed(String),

    /// Stored hash is not a PHC string
    #[error("Invalid password hash format: {0}")]
    InvalidHashFormat(String),
}

/// Hash a password with Argon2id and a fresh 16-byte random salt.
///
/// Returns a PHC string (`$argon2id$v=19$m=19456,t=2,p=1$...`) that carries its
/// own salt and parameters, so it can be stored as-is. The call is CPU bound
/// and deliberately slow; async callers should run it on a blocking worker.
///
/// # Example
/// ```
/// use library_auth::password::hash_password;
///
/// let hash = hash_password("Secret123").unwrap();
/// assert!(hash.starts_with("$argon2id$"));
/// ```
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    let password_hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PasswordError::HashingFailed(e.to_string()))?;

    Ok(password_hash.to_string())
}

/// Verify a password against a stored PHC hash.
///
/// The digest comparison is constant time. Returns `Ok(false)` on mismatch and
/// an error only when the stored hash cannot be parsed or checked.
///
/// # Example
/// ```
/// use library_auth::password::{hash_password, verify_password};
///
/// let hash = hash_password("Secret123").unwrap();
/// assert!(verify_password("Secret123", &hash).unwrap());
/// assert!(!verify_password("secret123", &hash).unwrap());
/// ```
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| PasswordError::InvalidHashFormat(e.to_string()))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::VerificationFailed(e.to_string())),
    }
}
