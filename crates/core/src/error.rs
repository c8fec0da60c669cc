//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures. Each variant
/// maps to exactly one HTTP status at the API boundary; storage failures live
/// in the infra layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Missing or malformed input.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Missing, malformed or unverifiable credential.
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    /// Role, ownership or account-status mismatch.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// A referenced entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The operation is not legal for the entity's current state.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// A uniqueness rule was violated (e.g. duplicate email).
    #[error("conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn unauthenticated(msg: impl Into<String>) -> Self {
        Self::Unauthenticated(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    /// Human-readable message without the variant prefix (safe for clients).
    pub fn message(&self) -> &str {
        match self {
            Self::Validation(m)
            | Self::Unauthenticated(m)
            | Self::Forbidden(m)
            | Self::NotFound(m)
            | Self::InvalidState(m)
            | Self::Conflict(m) => m,
        }
    }
}
