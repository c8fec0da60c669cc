//! HS256 bearer tokens.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, errors::ErrorKind};
use thiserror::Error;

use bazaar_core::{DomainError, UserId};

use crate::claims::{JwtClaims, TokenValidationError, validate_claims};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error(transparent)]
    Claims(#[from] TokenValidationError),

    #[error("failed to sign token: {0}")]
    Signing(String),
}

impl From<AuthError> for DomainError {
    fn from(value: AuthError) -> Self {
        match value {
            AuthError::Claims(TokenValidationError::Expired) => {
                DomainError::unauthenticated("Not authorized, token expired")
            }
            _ => DomainError::unauthenticated("Not authorized, token failed"),
        }
    }
}

/// Verifies a raw bearer credential and yields its claims.
pub trait JwtValidator: Send + Sync {
    fn validate(&self, token: &str) -> Result<JwtClaims, AuthError>;
}

/// Issues and verifies HS256-signed tokens with a fixed lifetime.
#[derive(Clone)]
pub struct Hs256TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl core::fmt::Debug for Hs256TokenService {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Hs256TokenService")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl Hs256TokenService {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a token for `user_id` valid from now.
    pub fn issue(&self, user_id: UserId) -> Result<String, AuthError> {
        self.issue_at(user_id, Utc::now())
    }

    /// Issue a token as if the current time were `issued_at`.
    pub fn issue_at(&self, user_id: UserId, issued_at: DateTime<Utc>) -> Result<String, AuthError> {
        let expires_at = issued_at
            .checked_add_signed(self.ttl)
            .ok_or_else(|| AuthError::Signing("token expiry out of range".to_string()))?;
        let claims = JwtClaims::new(user_id, issued_at, expires_at);
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::Signing(e.to_string()))
    }
}

impl JwtValidator for Hs256TokenService {
    fn validate(&self, token: &str) -> Result<JwtClaims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let data = jsonwebtoken::decode::<JwtClaims>(token, &self.decoding, &validation).map_err(
            |e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Claims(TokenValidationError::Expired),
                _ => AuthError::InvalidToken(e.to_string()),
            },
        )?;

        validate_claims(&data.claims, Utc::now())?;
        Ok(data.claims)
    }
}
