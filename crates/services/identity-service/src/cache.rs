//! Token cache: the single shared mutable resource behind sign-in, refresh,
//! validate, and verify-user.
//!
//! Two key families live here: `jwt:<email>` holds the current live token
//! pair for a user's session; `verify:<key>` holds the email a pending
//! verification key belongs to.

use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands, Client};
use serde::{Deserialize, Serialize};

use common::{AppError, AppResult};
use domain::{
    CACHE_PREFIX_JWT, CACHE_PREFIX_VERIFY, REFRESH_TOKEN_LIFETIME_HOURS, SECONDS_PER_HOUR,
    VERIFICATION_KEY_LIFETIME_MINUTES, SECONDS_PER_MINUTE,
};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// The live token pair cached for a user's session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Trait for the token/verification cache, mockable for service-layer tests.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait TokenCache: Send + Sync {
    /// Fetch the live token pair for a user, if any.
    async fn get_pair(&self, email: &str) -> AppResult<Option<CachedPair>>;

    /// Overwrite the live token pair for a user, replacing any prior one.
    async fn set_pair(&self, email: &str, pair: CachedPair) -> AppResult<()>;

    /// Atomically delete `jwt:<email>` iff its cached refresh token equals
    /// `refresh_token`. Returns whether the delete happened.
    async fn delete_pair_if_refresh_matches(&self, email: &str, refresh_token: &str) -> AppResult<bool>;

    /// Record a pending email-verification key.
    async fn set_verification(&self, key: &str, email: &str) -> AppResult<()>;

    /// Look up the email a verification key belongs to.
    async fn get_verification(&self, key: &str) -> AppResult<Option<String>>;

    /// Consume (delete) a verification key.
    async fn delete_verification(&self, key: &str) -> AppResult<()>;
}

/// Redis-backed implementation of the token cache.
#[derive(Clone)]
pub struct RedisTokenCache {
    connection: ConnectionManager,
}

impl RedisTokenCache {
    pub async fn connect(url: &str) -> Result<Self, redis::RedisError> {
        let client = Client::open(url)?;
        let connection = ConnectionManager::new(client).await?;
        Ok(Self { connection })
    }

    fn jwt_key(email: &str) -> String {
        format!("{}{}", CACHE_PREFIX_JWT, email)
    }

    fn verify_key(key: &str) -> String {
        format!("{}{}", CACHE_PREFIX_VERIFY, key)
    }
}

#[async_trait]
impl TokenCache for RedisTokenCache {
    async fn get_pair(&self, email: &str) -> AppResult<Option<CachedPair>> {
        let mut conn = self.connection.clone();
        let raw: Option<String> = conn.get(Self::jwt_key(email)).await.map_err(cache_error)?;

        match raw {
            Some(json) => {
                let pair = serde_json::from_str(&json)
                    .map_err(|e| AppError::internal(format!("Cache deserialization error: {}", e)))?;
                Ok(Some(pair))
            }
            None => Ok(None),
        }
    }

    async fn set_pair(&self, email: &str, pair: CachedPair) -> AppResult<()> {
        let mut conn = self.connection.clone();
        let json = serde_json::to_string(&pair)
            .map_err(|e| AppError::internal(format!("Cache serialization error: {}", e)))?;

        let ttl = REFRESH_TOKEN_LIFETIME_HOURS as u64 * SECONDS_PER_HOUR as u64;
        conn.set_ex::<_, _, ()>(Self::jwt_key(email), json, ttl)
            .await
            .map_err(cache_error)?;

        Ok(())
    }

    async fn delete_pair_if_refresh_matches(&self, email: &str, refresh_token: &str) -> AppResult<bool> {
        let mut conn = self.connection.clone();

        // Atomic compare-and-delete: only remove the cached pair if its
        // refresh_token field still equals the presented token, so a
        // concurrent winner's write can't be clobbered by a late loser.
        let script = r#"
            local raw = redis.call("GET", KEYS[1])
            if not raw then
                return 0
            end
            local ok, data = pcall(cjson.decode, raw)
            if not ok or data.refresh_token ~= ARGV[1] then
                return 0
            end
            redis.call("DEL", KEYS[1])
            return 1
        "#;

        let deleted: i32 = redis::cmd("EVAL")
            .arg(script)
            .arg(1)
            .arg(Self::jwt_key(email))
            .arg(refresh_token)
            .query_async(&mut conn)
            .await
            .map_err(cache_error)?;

        Ok(deleted == 1)
    }

    async fn set_verification(&self, key: &str, email: &str) -> AppResult<()> {
        let mut conn = self.connection.clone();
        let ttl = VERIFICATION_KEY_LIFETIME_MINUTES as u64 * SECONDS_PER_MINUTE as u64;

        conn.set_ex::<_, _, ()>(Self::verify_key(key), email, ttl)
            .await
            .map_err(cache_error)?;

        Ok(())
    }

    async fn get_verification(&self, key: &str) -> AppResult<Option<String>> {
        let mut conn = self.connection.clone();
        conn.get(Self::verify_key(key)).await.map_err(cache_error)
    }

    async fn delete_verification(&self, key: &str) -> AppResult<()> {
        let mut conn = self.connection.clone();
        let _: () = conn.del(Self::verify_key(key)).await.map_err(cache_error)?;
        Ok(())
    }
}

fn cache_error(e: redis::RedisError) -> AppError {
    tracing::error!("Redis error: {}", e);
    AppError::internal(format!("Cache error: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jwt_key_uses_expected_prefix() {
        assert_eq!(RedisTokenCache::jwt_key("a@b.com"), "jwt:a@b.com");
    }

    #[test]
    fn verify_key_uses_expected_prefix() {
        assert_eq!(RedisTokenCache::verify_key("abc123"), "verify:abc123");
    }
}
