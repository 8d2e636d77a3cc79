//! Token codec: signs and verifies bearer tokens, independent of role policy.

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use domain::{Claims, DomainError, DomainResult, ACCESS_TOKEN_LIFETIME_HOURS, REFRESH_TOKEN_LIFETIME_HOURS, SECONDS_PER_HOUR};

/// Signs and verifies JWT access/refresh tokens against a process secret.
///
/// Knows nothing about roles beyond the `role` claim it is handed; callers
/// check whether a decoded token is the kind they expect.
pub struct TokenCodec {
    secret: String,
}

impl TokenCodec {
    pub fn new(secret: String) -> Self {
        Self { secret }
    }

    fn secret_bytes(&self) -> &[u8] {
        self.secret.as_bytes()
    }

    /// Sign a fresh access token for a user.
    pub fn issue_access(&self, user_id: Uuid, email: String) -> DomainResult<String> {
        let claims = Claims::new_access(user_id, email, ACCESS_TOKEN_LIFETIME_HOURS * SECONDS_PER_HOUR);
        self.encode(&claims)
    }

    /// Sign a fresh refresh token for a user.
    pub fn issue_refresh(&self, user_id: Uuid, email: String) -> DomainResult<String> {
        let claims = Claims::new_refresh(user_id, email, REFRESH_TOKEN_LIFETIME_HOURS * SECONDS_PER_HOUR);
        self.encode(&claims)
    }

    fn encode(&self, claims: &Claims) -> DomainResult<String> {
        encode(&Header::default(), claims, &EncodingKey::from_secret(self.secret_bytes()))
            .map_err(|e| DomainError::internal(format!("Token signing failed: {}", e)))
    }

    /// Decode and verify a token, mapping failures onto the codec's three
    /// distinct error kinds.
    pub fn decode(&self, token: &str) -> DomainResult<Claims> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret_bytes()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => DomainError::TokenExpired,
            jsonwebtoken::errors::ErrorKind::InvalidSignature => DomainError::SignatureInvalid,
            _ => DomainError::TokenMalformed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> TokenCodec {
        TokenCodec::new("a-test-secret-that-is-long-enough".to_string())
    }

    #[test]
    fn round_trips_access_claims() {
        let codec = codec();
        let id = Uuid::new_v4();
        let token = codec.issue_access(id, "user@example.com".to_string()).unwrap();

        let claims = codec.decode(&token).unwrap();
        assert_eq!(claims.sub, id);
        assert!(claims.is_access());
    }

    #[test]
    fn reissued_tokens_are_distinct_even_within_one_second() {
        let codec = codec();
        let id = Uuid::new_v4();
        let a = codec.issue_access(id, "user@example.com".to_string()).unwrap();
        let b = codec.issue_access(id, "user@example.com".to_string()).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn rejects_token_signed_with_different_secret() {
        let token = codec()
            .issue_access(Uuid::new_v4(), "user@example.com".to_string())
            .unwrap();

        let other = TokenCodec::new("a-different-secret-entirely".to_string());
        let err = other.decode(&token).unwrap_err();
        assert!(matches!(err, DomainError::SignatureInvalid));
    }

    #[test]
    fn rejects_malformed_token() {
        let err = codec().decode("not-a-jwt-at-all").unwrap_err();
        assert!(matches!(err, DomainError::TokenMalformed));
    }
}
