//! Identity orchestration: the five operations reachable from the broker.

use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use common::{AppError, AppResult};
use domain::{DomainError, DomainResult, Password, TokenPair, User, VerificationKey};

use crate::cache::{CachedPair, TokenCache};
use crate::mail::MailDispatcher;
use crate::repository::CredentialStore;
use crate::token_codec::TokenCodec;

/// Result of a successful sign-up.
#[derive(Debug, Clone)]
pub struct SignUpOutcome {
    pub status: String,
    pub message: String,
}

/// Result of a verify-user attempt; failures are carried in the body rather
/// than thrown, since this endpoint is reached from a clickable link.
#[derive(Debug, Clone)]
pub struct VerifyOutcome {
    pub status: String,
    pub message: String,
}

/// Result of validate-token.
#[derive(Debug, Clone)]
pub struct TokenValidation {
    pub is_valid: bool,
    pub is_verified: bool,
    pub message: String,
}

/// The five identity operations, all reachable via the broker's
/// request/reply pattern.
#[async_trait]
pub trait IdentityService: Send + Sync {
    async fn sign_up(
        &self,
        firstname: String,
        lastname: String,
        email: String,
        password: String,
    ) -> AppResult<SignUpOutcome>;

    async fn verify_user(&self, key: String) -> AppResult<VerifyOutcome>;

    async fn sign_in(&self, email: String, password: String) -> AppResult<TokenPair>;

    async fn refresh_token(&self, token: String) -> DomainResult<TokenPair>;

    async fn validate_token(&self, token: String) -> DomainResult<TokenValidation>;
}

/// Concrete orchestration wiring the Credential Store, Token Cache, Token
/// Codec, Password Hasher, and Mail Dispatcher together.
pub struct IdentityOrchestrator {
    store: Arc<dyn CredentialStore>,
    cache: Arc<dyn TokenCache>,
    codec: Arc<TokenCodec>,
    mail: Arc<dyn MailDispatcher>,
}

impl IdentityOrchestrator {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        cache: Arc<dyn TokenCache>,
        codec: Arc<TokenCodec>,
        mail: Arc<dyn MailDispatcher>,
    ) -> Self {
        Self {
            store,
            cache,
            codec,
            mail,
        }
    }

    /// Issue a fresh access/refresh pair and cache it, replacing any prior
    /// live pair for this user.
    async fn issue_and_cache(&self, user: &User) -> AppResult<TokenPair> {
        let access_token = self
            .codec
            .issue_access(user.id, user.email.clone())
            .map_err(AppError::from)?;
        let refresh_token = self
            .codec
            .issue_refresh(user.id, user.email.clone())
            .map_err(AppError::from)?;

        self.cache
            .set_pair(
                &user.email,
                CachedPair {
                    access_token: access_token.clone(),
                    refresh_token: refresh_token.clone(),
                },
            )
            .await?;

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }
}

#[async_trait]
impl IdentityService for IdentityOrchestrator {
    async fn sign_up(
        &self,
        firstname: String,
        lastname: String,
        email: String,
        password: String,
    ) -> AppResult<SignUpOutcome> {
        if self.store.find_by_email(&email).await?.is_some() {
            return Err(AppError::conflict("User with such email already exists"));
        }

        // Argon2 is CPU-bound; run it on the blocking pool so it can't stall
        // the broker consumer.
        let password_hash = tokio::task::spawn_blocking(move || Password::new(&password))
            .await
            .map_err(|e| AppError::internal(format!("hashing task failed: {e}")))?
            .map_err(AppError::from)?
            .into_string();

        let key = VerificationKey::generate();

        // Cache write precedes the persistent insert: a crash between the
        // two leaves only an orphaned, TTL-cleaned cache entry.
        self.cache
            .set_verification(key.as_str(), &email)
            .await?;

        let user = User::new(Uuid::new_v4(), email.clone(), password_hash, firstname, lastname);
        self.store.insert(user).await?;

        // Fire-and-forget: failure does not fail sign-up.
        self.mail.dispatch_verification(email, key.to_string());

        Ok(SignUpOutcome {
            status: "success".to_string(),
            message: "registered; verify via email".to_string(),
        })
    }

    async fn verify_user(&self, key: String) -> AppResult<VerifyOutcome> {
        let email = match self.cache.get_verification(&key).await? {
            Some(email) => email,
            None => {
                return Ok(VerifyOutcome {
                    status: "error".to_string(),
                    message: "Invalid or expired verification key".to_string(),
                })
            }
        };

        let user = match self.store.find_by_email(&email).await? {
            Some(user) => user,
            None => {
                return Ok(VerifyOutcome {
                    status: "error".to_string(),
                    message: "no such user".to_string(),
                })
            }
        };

        if user.is_verified {
            return Ok(VerifyOutcome {
                status: "error".to_string(),
                message: "already verified".to_string(),
            });
        }

        self.cache.delete_verification(&key).await?;
        self.store.update_verified(user.id, true).await?;

        Ok(VerifyOutcome {
            status: "success".to_string(),
            message: "User has been verified".to_string(),
        })
    }

    async fn sign_in(&self, email: String, password: String) -> AppResult<TokenPair> {
        let user = self.store.find_by_email(&email).await?;

        // Password verification always runs, against a dummy hash when the
        // user doesn't exist, so lookup-miss and bad-password are
        // statistically indistinguishable by timing.
        let stored_password = match &user {
            Some(user) => Password::from_hash(user.password_hash.as_str()),
            None => Password::dummy(),
        };
        let password_valid = tokio::task::spawn_blocking(move || stored_password.verify(&password))
            .await
            .map_err(|e| AppError::internal(format!("hashing task failed: {e}")))?;

        let user = match user {
            None => return Err(AppError::conflict("no such user")),
            Some(_) if !password_valid => return Err(AppError::conflict("bad password")),
            Some(user) => user,
        };

        self.issue_and_cache(&user).await
    }

    async fn refresh_token(&self, token: String) -> DomainResult<TokenPair> {
        let claims = self.codec.decode(&token)?;

        if !claims.is_refresh() {
            return Err(DomainError::NotRefreshToken);
        }

        let cached = self
            .cache
            .get_pair(&claims.email)
            .await
            .map_err(|e| DomainError::internal(e.to_string()))?
            .ok_or(DomainError::NotRefreshToken)?;

        if cached.refresh_token != token {
            return Err(DomainError::NotRefreshToken);
        }

        let deleted = self
            .cache
            .delete_pair_if_refresh_matches(&claims.email, &token)
            .await
            .map_err(|e| DomainError::internal(e.to_string()))?;

        if !deleted {
            // Lost the race with a concurrent refresh for the same user.
            return Err(DomainError::NotRefreshToken);
        }

        let user = self
            .store
            .find_by_email(&claims.email)
            .await
            .map_err(|e| DomainError::internal(e.to_string()))?
            .ok_or(DomainError::NotRefreshToken)?;

        self.issue_and_cache(&user)
            .await
            .map_err(|e| DomainError::internal(e.to_string()))
    }

    async fn validate_token(&self, token: String) -> DomainResult<TokenValidation> {
        let claims = self.codec.decode(&token)?;

        if !claims.is_access() {
            return Err(DomainError::NotAccessToken);
        }

        let cached = self
            .cache
            .get_pair(&claims.email)
            .await
            .map_err(|e| DomainError::internal(e.to_string()))?
            .ok_or(DomainError::NotAccessToken)?;

        if cached.access_token != token {
            return Err(DomainError::NotAccessToken);
        }

        let user = self
            .store
            .find_by_email(&claims.email)
            .await
            .map_err(|e| DomainError::internal(e.to_string()))?
            .ok_or(DomainError::NotAccessToken)?;

        Ok(TokenValidation {
            is_valid: true,
            is_verified: user.is_verified,
            message: "Token is valid".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use mockall::Sequence;

    use crate::cache::MockTokenCache;
    use crate::mail::MockMailDispatcher;
    use crate::repository::MockCredentialStore;
    use domain::Claims;

    const SECRET: &str = "unit-test-secret-that-is-long-enough";
    const EMAIL: &str = "example@gmail.com";
    const PASSWORD: &str = "StrongPassword123!";

    fn codec() -> Arc<TokenCodec> {
        Arc::new(TokenCodec::new(SECRET.to_string()))
    }

    fn test_user(verified: bool) -> User {
        User {
            id: Uuid::new_v4(),
            email: EMAIL.to_string(),
            password_hash: Password::new(PASSWORD).unwrap().into_string(),
            firstname: "John".to_string(),
            lastname: "Kowalski".to_string(),
            is_verified: verified,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn orchestrator(
        store: MockCredentialStore,
        cache: MockTokenCache,
        mail: MockMailDispatcher,
        codec: Arc<TokenCodec>,
    ) -> IdentityOrchestrator {
        IdentityOrchestrator::new(Arc::new(store), Arc::new(cache), codec, Arc::new(mail))
    }

    /// Sign a token directly, bypassing the codec's always-in-the-future
    /// lifetimes, so expired tokens can be minted.
    fn mint(claims: &Claims) -> String {
        jsonwebtoken::encode(
            &jsonwebtoken::Header::default(),
            claims,
            &jsonwebtoken::EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn sign_up_rejects_duplicate_email() {
        let mut store = MockCredentialStore::new();
        store
            .expect_find_by_email()
            .returning(|_| Ok(Some(test_user(false))));

        let service = orchestrator(store, MockTokenCache::new(), MockMailDispatcher::new(), codec());
        let result = service
            .sign_up("John".into(), "Kowalski".into(), EMAIL.into(), PASSWORD.into())
            .await;

        match result {
            Err(AppError::Conflict(msg)) => assert_eq!(msg, "User with such email already exists"),
            other => panic!("expected conflict, got {:?}", other.map(|o| o.status)),
        }
    }

    #[tokio::test]
    async fn sign_up_caches_key_before_insert_and_mails_last() {
        let mut seq = Sequence::new();
        let mut store = MockCredentialStore::new();
        let mut cache = MockTokenCache::new();
        let mut mail = MockMailDispatcher::new();

        store.expect_find_by_email().returning(|_| Ok(None));
        cache
            .expect_set_verification()
            .withf(|_, email| email == EMAIL)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));
        store
            .expect_insert()
            .withf(|user| user.email == EMAIL && !user.is_verified)
            .times(1)
            .in_sequence(&mut seq)
            .returning(Ok);
        mail.expect_dispatch_verification()
            .withf(|to, _| to == EMAIL)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| ());

        let service = orchestrator(store, cache, mail, codec());
        let outcome = service
            .sign_up("John".into(), "Kowalski".into(), EMAIL.into(), PASSWORD.into())
            .await
            .unwrap();

        assert_eq!(outcome.status, "success");
    }

    #[tokio::test]
    async fn sign_up_rejects_weak_password() {
        let mut store = MockCredentialStore::new();
        store.expect_find_by_email().returning(|_| Ok(None));

        let service = orchestrator(store, MockTokenCache::new(), MockMailDispatcher::new(), codec());
        let result = service
            .sign_up("John".into(), "Kowalski".into(), EMAIL.into(), "alllowercase".into())
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn sign_in_unknown_user_is_conflict() {
        let mut store = MockCredentialStore::new();
        store.expect_find_by_email().returning(|_| Ok(None));

        let service = orchestrator(store, MockTokenCache::new(), MockMailDispatcher::new(), codec());
        let result = service.sign_in(EMAIL.into(), PASSWORD.into()).await;

        match result {
            Err(AppError::Conflict(msg)) => assert_eq!(msg, "no such user"),
            other => panic!("expected conflict, got {:?}", other.is_ok()),
        }
    }

    #[tokio::test]
    async fn sign_in_wrong_password_is_conflict() {
        let mut store = MockCredentialStore::new();
        store
            .expect_find_by_email()
            .returning(|_| Ok(Some(test_user(false))));

        let service = orchestrator(store, MockTokenCache::new(), MockMailDispatcher::new(), codec());
        let result = service.sign_in(EMAIL.into(), "WrongPassword123!".into()).await;

        match result {
            Err(AppError::Conflict(msg)) => assert_eq!(msg, "bad password"),
            other => panic!("expected conflict, got {:?}", other.is_ok()),
        }
    }

    #[tokio::test]
    async fn sign_in_issues_and_caches_a_fresh_pair() {
        let codec = codec();
        let mut store = MockCredentialStore::new();
        let mut cache = MockTokenCache::new();
        store
            .expect_find_by_email()
            .returning(|_| Ok(Some(test_user(false))));
        cache
            .expect_set_pair()
            .withf(|email, pair| email == EMAIL && pair.access_token != pair.refresh_token)
            .times(1)
            .returning(|_, _| Ok(()));

        let service = orchestrator(store, cache, MockMailDispatcher::new(), codec.clone());
        let pair = service.sign_in(EMAIL.into(), PASSWORD.into()).await.unwrap();

        let access = codec.decode(&pair.access_token).unwrap();
        let refresh = codec.decode(&pair.refresh_token).unwrap();
        assert!(access.is_access());
        assert!(refresh.is_refresh());
        assert_eq!(access.email, EMAIL);
    }

    #[tokio::test]
    async fn refresh_rejects_an_access_token() {
        let codec = codec();
        let token = codec.issue_access(Uuid::new_v4(), EMAIL.into()).unwrap();

        let service = orchestrator(
            MockCredentialStore::new(),
            MockTokenCache::new(),
            MockMailDispatcher::new(),
            codec,
        );
        let result = service.refresh_token(token).await;

        assert!(matches!(result, Err(DomainError::NotRefreshToken)));
    }

    #[tokio::test]
    async fn refresh_rejects_a_token_with_no_cache_entry() {
        let codec = codec();
        let token = codec.issue_refresh(Uuid::new_v4(), EMAIL.into()).unwrap();

        let mut cache = MockTokenCache::new();
        cache.expect_get_pair().returning(|_| Ok(None));

        let service = orchestrator(MockCredentialStore::new(), cache, MockMailDispatcher::new(), codec);
        let result = service.refresh_token(token).await;

        assert!(matches!(result, Err(DomainError::NotRefreshToken)));
    }

    #[tokio::test]
    async fn refresh_rejects_a_superseded_refresh_token() {
        let codec = codec();
        let user_id = Uuid::new_v4();
        let old_refresh = codec.issue_refresh(user_id, EMAIL.into()).unwrap();
        let current = CachedPair {
            access_token: codec.issue_access(user_id, EMAIL.into()).unwrap(),
            refresh_token: "a.newer.refresh".to_string(),
        };

        let mut cache = MockTokenCache::new();
        cache.expect_get_pair().returning(move |_| Ok(Some(current.clone())));

        let service = orchestrator(MockCredentialStore::new(), cache, MockMailDispatcher::new(), codec);
        let result = service.refresh_token(old_refresh).await;

        assert!(matches!(result, Err(DomainError::NotRefreshToken)));
    }

    #[tokio::test]
    async fn refresh_rejects_the_loser_of_a_concurrent_race() {
        let codec = codec();
        let user_id = Uuid::new_v4();
        let refresh = codec.issue_refresh(user_id, EMAIL.into()).unwrap();
        let cached = CachedPair {
            access_token: codec.issue_access(user_id, EMAIL.into()).unwrap(),
            refresh_token: refresh.clone(),
        };

        let mut cache = MockTokenCache::new();
        cache.expect_get_pair().returning(move |_| Ok(Some(cached.clone())));
        // The compare-and-delete observes a concurrent winner's write.
        cache
            .expect_delete_pair_if_refresh_matches()
            .returning(|_, _| Ok(false));

        let service = orchestrator(MockCredentialStore::new(), cache, MockMailDispatcher::new(), codec);
        let result = service.refresh_token(refresh).await;

        assert!(matches!(result, Err(DomainError::NotRefreshToken)));
    }

    #[tokio::test]
    async fn refresh_rotates_the_cached_pair() {
        let codec = codec();
        let user = test_user(true);
        let refresh = codec.issue_refresh(user.id, EMAIL.into()).unwrap();
        let cached = CachedPair {
            access_token: codec.issue_access(user.id, EMAIL.into()).unwrap(),
            refresh_token: refresh.clone(),
        };

        let mut store = MockCredentialStore::new();
        let mut cache = MockTokenCache::new();
        store
            .expect_find_by_email()
            .returning(move |_| Ok(Some(user.clone())));
        cache.expect_get_pair().returning(move |_| Ok(Some(cached.clone())));
        cache
            .expect_delete_pair_if_refresh_matches()
            .withf({
                let refresh = refresh.clone();
                move |email, token| email == EMAIL && token == refresh
            })
            .times(1)
            .returning(|_, _| Ok(true));
        cache.expect_set_pair().times(1).returning(|_, _| Ok(()));

        let service = orchestrator(store, cache, MockMailDispatcher::new(), codec.clone());
        let pair = service.refresh_token(refresh.clone()).await.unwrap();

        assert_ne!(pair.refresh_token, refresh);
        assert!(codec.decode(&pair.refresh_token).unwrap().is_refresh());
    }

    #[tokio::test]
    async fn refresh_maps_an_expired_token() {
        let claims = Claims::new_refresh(Uuid::new_v4(), EMAIL.into(), -3600);
        let token = mint(&claims);

        let service = orchestrator(
            MockCredentialStore::new(),
            MockTokenCache::new(),
            MockMailDispatcher::new(),
            codec(),
        );
        let result = service.refresh_token(token).await;

        assert!(matches!(result, Err(DomainError::TokenExpired)));
    }

    #[tokio::test]
    async fn validate_rejects_a_refresh_token() {
        let codec = codec();
        let token = codec.issue_refresh(Uuid::new_v4(), EMAIL.into()).unwrap();

        let service = orchestrator(
            MockCredentialStore::new(),
            MockTokenCache::new(),
            MockMailDispatcher::new(),
            codec,
        );
        let result = service.validate_token(token).await;

        assert!(matches!(result, Err(DomainError::NotAccessToken)));
    }

    #[tokio::test]
    async fn validate_rejects_an_access_token_revoked_by_refresh() {
        let codec = codec();
        let user_id = Uuid::new_v4();
        let old_access = codec.issue_access(user_id, EMAIL.into()).unwrap();
        let current = CachedPair {
            access_token: "a.newer.access".to_string(),
            refresh_token: codec.issue_refresh(user_id, EMAIL.into()).unwrap(),
        };

        let mut cache = MockTokenCache::new();
        cache.expect_get_pair().returning(move |_| Ok(Some(current.clone())));

        let service = orchestrator(MockCredentialStore::new(), cache, MockMailDispatcher::new(), codec);
        let result = service.validate_token(old_access).await;

        assert!(matches!(result, Err(DomainError::NotAccessToken)));
    }

    #[tokio::test]
    async fn validate_surfaces_verification_status() {
        let codec = codec();
        let user = test_user(true);
        let access = codec.issue_access(user.id, EMAIL.into()).unwrap();
        let cached = CachedPair {
            access_token: access.clone(),
            refresh_token: codec.issue_refresh(user.id, EMAIL.into()).unwrap(),
        };

        let mut store = MockCredentialStore::new();
        let mut cache = MockTokenCache::new();
        store
            .expect_find_by_email()
            .returning(move |_| Ok(Some(user.clone())));
        cache.expect_get_pair().returning(move |_| Ok(Some(cached.clone())));

        let service = orchestrator(store, cache, MockMailDispatcher::new(), codec);
        let validation = service.validate_token(access).await.unwrap();

        assert!(validation.is_valid);
        assert!(validation.is_verified);
        assert_eq!(validation.message, "Token is valid");
    }

    #[tokio::test]
    async fn validate_maps_a_malformed_token() {
        let service = orchestrator(
            MockCredentialStore::new(),
            MockTokenCache::new(),
            MockMailDispatcher::new(),
            codec(),
        );
        let result = service.validate_token("not-a-jwt".into()).await;

        assert!(matches!(result, Err(DomainError::TokenMalformed)));
    }

    #[tokio::test]
    async fn verify_user_reports_an_unknown_key_in_band() {
        let mut cache = MockTokenCache::new();
        cache.expect_get_verification().returning(|_| Ok(None));

        let service = orchestrator(MockCredentialStore::new(), cache, MockMailDispatcher::new(), codec());
        let outcome = service.verify_user("bogus".into()).await.unwrap();

        assert_eq!(outcome.status, "error");
        assert_eq!(outcome.message, "Invalid or expired verification key");
    }

    #[tokio::test]
    async fn verify_user_is_idempotent_for_an_already_verified_user() {
        let mut store = MockCredentialStore::new();
        let mut cache = MockTokenCache::new();
        cache
            .expect_get_verification()
            .returning(|_| Ok(Some(EMAIL.to_string())));
        store
            .expect_find_by_email()
            .returning(|_| Ok(Some(test_user(true))));

        let service = orchestrator(store, cache, MockMailDispatcher::new(), codec());
        let outcome = service.verify_user("some-key".into()).await.unwrap();

        assert_eq!(outcome.status, "error");
        assert_eq!(outcome.message, "already verified");
    }

    #[tokio::test]
    async fn verify_user_consumes_the_key_and_flips_the_flag() {
        let user = test_user(false);
        let user_id = user.id;

        let mut store = MockCredentialStore::new();
        let mut cache = MockTokenCache::new();
        cache
            .expect_get_verification()
            .returning(|_| Ok(Some(EMAIL.to_string())));
        store
            .expect_find_by_email()
            .returning(move |_| Ok(Some(user.clone())));
        cache
            .expect_delete_verification()
            .times(1)
            .returning(|_| Ok(()));
        store
            .expect_update_verified()
            .withf(move |id, verified| *id == user_id && *verified)
            .times(1)
            .returning(|_, _| Ok(()));

        let service = orchestrator(store, cache, MockMailDispatcher::new(), codec());
        let outcome = service.verify_user("some-key".into()).await.unwrap();

        assert_eq!(outcome.status, "success");
        assert_eq!(outcome.message, "User has been verified");
    }
}
