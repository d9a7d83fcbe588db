//! JWT (JSON Web Token) issuance and validation

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::credentials::Credential;

/// Claims carried by a session token
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenClaims {
    /// Subject (user UUID)
    pub sub: String,
    /// Display username
    pub username: String,
    /// User role
    pub role: String,
    /// Issuer
    pub iss: String,
    /// Audience
    pub aud: String,
    /// Issued at (timestamp)
    pub iat: i64,
    /// Expiration time (timestamp)
    pub exp: i64,
}

impl TokenClaims {
    pub fn is_expired_at(&self, now: i64) -> bool {
        now > self.exp
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(self.exp, 0).unwrap_or_else(Utc::now)
    }
}

/// JWT errors
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Failed to sign token: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),

    #[error("Token expired")]
    Expired,

    #[error("Invalid token: {0}")]
    Invalid(String),

    #[error("Invalid token settings: {0}")]
    InvalidSettings(String),
}

/// Deployment configuration for the token service
#[derive(Clone)]
pub struct TokenSettings {
    secret: Vec<u8>,
    issuer: String,
    audience: String,
    lifetime: Duration,
}

impl TokenSettings {
    pub fn new(
        secret: impl Into<Vec<u8>>,
        issuer: impl Into<String>,
        audience: impl Into<String>,
        lifetime: Duration,
    ) -> Result<Self, TokenError> {
        let secret = secret.into();
        let issuer = issuer.into();
        let audience = audience.into();

        if secret.is_empty() {
            return Err(TokenError::InvalidSettings(
                "signing secret must not be empty".to_string(),
            ));
        }
        if issuer.trim().is_empty() || audience.trim().is_empty() {
            return Err(TokenError::InvalidSettings(
                "issuer and audience must not be empty".to_string(),
            ));
        }
        if lifetime <= Duration::zero() {
            return Err(TokenError::InvalidSettings(
                "token lifetime must be positive".to_string(),
            ));
        }

        Ok(Self {
            secret,
            issuer,
            audience,
            lifetime,
        })
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn audience(&self) -> &str {
        &self.audience
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }
}

impl fmt::Debug for TokenSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSettings")
            .field("secret", &"<redacted>")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("lifetime", &self.lifetime)
            .finish()
    }
}

/// A freshly minted token
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: TokenClaims,
}

impl IssuedToken {
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.claims.expires_at()
    }
}

/// Issues and validates HMAC-SHA256 session tokens
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    issuer: String,
    audience: String,
    lifetime: Duration,
}

impl TokenService {
    /// Validates signature, algorithm, issuer and audience, and requires
    /// `sub`, `exp`, `iss` and `aud`. Expiry is checked against the caller's
    /// clock with zero leeway (see [`TokenService::validate_at`]).
    pub fn new(settings: TokenSettings) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.leeway = 0;
        validation.set_issuer(&[settings.issuer.as_str()]);
        validation.set_audience(&[settings.audience.as_str()]);
        validation.set_required_spec_claims(&["sub", "exp", "iss", "aud"]);

        Self {
            encoding_key: EncodingKey::from_secret(&settings.secret),
            decoding_key: DecodingKey::from_secret(&settings.secret),
            validation,
            issuer: settings.issuer,
            audience: settings.audience,
            lifetime: settings.lifetime,
        }
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// Mint a token for `credential` valid from now for the configured lifetime
    pub fn issue(&self, credential: &Credential) -> Result<IssuedToken, TokenError> {
        self.issue_at(credential, Utc::now().timestamp())
    }

    pub fn issue_at(&self, credential: &Credential, now: i64) -> Result<IssuedToken, TokenError> {
        let claims = TokenClaims {
            sub: credential.id.to_string(),
            username: credential.username.clone(),
            role: credential.role.clone(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            iat: now,
            exp: now + self.lifetime.num_seconds(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?;

        debug!(
            user_id = %claims.sub,
            username = %claims.username,
            exp = claims.exp,
            "Issued session token"
        );

        Ok(IssuedToken { token, claims })
    }

    pub fn validate(&self, token: &str) -> Result<TokenClaims, TokenError> {
        self.validate_at(token, Utc::now().timestamp())
    }

    /// Validate `token` as seen at unix time `now`.
    ///
    /// The token is accepted while `now <= exp`.
    pub fn validate_at(&self, token: &str, now: i64) -> Result<TokenClaims, TokenError> {
        let token_data = decode::<TokenClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| TokenError::Invalid(e.to_string()))?;

        if token_data.claims.is_expired_at(now) {
            return Err(TokenError::Expired);
        }

        Ok(token_data.claims)
    }
}
