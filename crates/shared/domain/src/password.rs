//! Password value object.
//!
//! Encapsulates adaptive salted hashing as a domain value object so callers never
//! handle a raw hash string directly.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::constants::{MAX_PASSWORD_LENGTH, MIN_PASSWORD_LENGTH};
use crate::error::DomainError;

/// A known-bad Argon2id hash that always fails verification.
///
/// Used to keep sign-in's password check running for a consistent duration
/// whether or not the looked-up user exists, so lookup-miss and
/// password-mismatch are not distinguishable by timing.
pub const DUMMY_HASH: &str =
    "$argon2id$v=19$m=19456,t=2,p=1$dummysalt123456$dummyhash1234567890123456789012";

/// Password value object that handles hashing and verification.
///
/// Value object: immutable, compared by value. Its `Debug` impl redacts the
/// hash so it never leaks into logs.
#[derive(Clone)]
pub struct Password {
    hash: String,
}

impl std::fmt::Debug for Password {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Password")
            .field("hash", &"[REDACTED]")
            .finish()
    }
}

impl Password {
    /// Hash a plaintext password after checking it against the sign-up policy:
    /// length bounds and at least one of each character class (upper, lower,
    /// digit, symbol).
    pub fn new(plain_text: &str) -> Result<Self, DomainError> {
        if plain_text.len() < MIN_PASSWORD_LENGTH {
            return Err(DomainError::password(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LENGTH
            )));
        }
        if plain_text.len() > MAX_PASSWORD_LENGTH {
            return Err(DomainError::password(format!(
                "Password must be at most {} characters",
                MAX_PASSWORD_LENGTH
            )));
        }

        let has_upper = plain_text.chars().any(|c| c.is_ascii_uppercase());
        let has_lower = plain_text.chars().any(|c| c.is_ascii_lowercase());
        let has_digit = plain_text.chars().any(|c| c.is_ascii_digit());
        let has_symbol = plain_text
            .chars()
            .any(|c| c.is_ascii() && !c.is_ascii_alphanumeric());

        if !(has_upper && has_lower && has_digit && has_symbol) {
            return Err(DomainError::password(
                "Password must contain at least one uppercase letter, one lowercase letter, one digit, and one symbol",
            ));
        }

        let hash = Self::hash(plain_text)?;
        Ok(Self { hash })
    }

    /// Wrap an existing hash (loaded from the credential store).
    pub fn from_hash(hash: impl Into<String>) -> Self {
        Self { hash: hash.into() }
    }

    /// The dummy hash used to defeat user-enumeration-by-timing on sign-in.
    pub fn dummy() -> Self {
        Self::from_hash(DUMMY_HASH)
    }

    /// Borrow the hash string for storage.
    pub fn as_str(&self) -> &str {
        &self.hash
    }

    /// Consume and return the hash string.
    pub fn into_string(self) -> String {
        self.hash
    }

    /// Verify a plaintext password against this hash.
    pub fn verify(&self, plain_text: &str) -> bool {
        Self::verify_hash(plain_text, &self.hash).unwrap_or(false)
    }

    fn hash(plain_text: &str) -> Result<String, DomainError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Self::argon2()
            .hash_password(plain_text.as_bytes(), &salt)
            .map_err(|e| DomainError::internal(format!("Password hash failed: {}", e)))?;
        Ok(hash.to_string())
    }

    fn verify_hash(plain_text: &str, hash: &str) -> Result<bool, DomainError> {
        let parsed = PasswordHash::new(hash)
            .map_err(|e| DomainError::internal(format!("Invalid hash format: {}", e)))?;
        Ok(Self::argon2()
            .verify_password(plain_text.as_bytes(), &parsed)
            .is_ok())
    }

    #[inline]
    fn argon2() -> Argon2<'static> {
        Argon2::default()
    }
}

impl From<Password> for String {
    fn from(password: Password) -> Self {
        password.hash
    }
}

impl PartialEq for Password {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
    }
}

impl Eq for Password {}
