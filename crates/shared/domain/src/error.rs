//! Domain-level errors.
//!
//! These errors represent business rule violations and domain logic failures.
//! They are independent of infrastructure concerns (HTTP, the broker, the cache).

use thiserror::Error;

/// Domain-specific errors for business rule violations.
#[derive(Error, Debug, Clone)]
pub enum DomainError {
    /// Validation failed for a field or input.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Password-related errors.
    #[error("Password error: {0}")]
    Password(String),

    /// Entity not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Entity already exists, or a state transition was attempted twice.
    #[error("{0}")]
    Conflict(String),

    /// A verification key does not resolve to a pending verification.
    #[error("Invalid or expired verification key")]
    InvalidKey,

    /// A bearer token's signature could not be verified.
    #[error("Token signature is invalid")]
    SignatureInvalid,

    /// A bearer token is well-formed but its validity period has elapsed.
    #[error("Token has expired")]
    TokenExpired,

    /// A bearer token could not be parsed.
    #[error("Token is malformed")]
    TokenMalformed,

    /// A token presented where an access token was required is not one.
    #[error("Provided token is not an access token")]
    NotAccessToken,

    /// A token presented where a refresh token was required is not one.
    #[error("Provided token is not a refresh token")]
    NotRefreshToken,

    /// Invalid credentials provided.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Internal domain error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DomainError {
    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        DomainError::Validation(msg.into())
    }

    /// Create a password error.
    pub fn password(msg: impl Into<String>) -> Self {
        DomainError::Password(msg.into())
    }

    /// Create a not found error.
    pub fn not_found(entity: impl Into<String>) -> Self {
        DomainError::NotFound(entity.into())
    }

    /// Create a conflict error.
    pub fn conflict(msg: impl Into<String>) -> Self {
        DomainError::Conflict(msg.into())
    }

    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        DomainError::Internal(msg.into())
    }

    /// Maps token-flow failures onto the in-band message table: `TokenExpired`,
    /// `SignatureInvalid`/`TokenMalformed`, `NotRefreshToken`, `NotAccessToken`,
    /// else a generic verification failure.
    pub fn token_message(&self) -> &'static str {
        match self {
            DomainError::TokenExpired => "Token expired",
            DomainError::SignatureInvalid | DomainError::TokenMalformed => "Invalid token",
            DomainError::NotRefreshToken => "Provided token is not a refresh token",
            DomainError::NotAccessToken => "Provided token is not an access token",
            _ => "Token verification failed",
        }
    }
}

/// Result type alias for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
