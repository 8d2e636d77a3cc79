//! Token claims and the access/refresh pair returned to callers.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::{ROLE_ACCESS, ROLE_REFRESH};

/// JWT claims shared by access and refresh tokens.
///
/// `role` distinguishes the two token kinds (`"access"` / `"refresh"`); it is
/// not a user authorization role. `jti` makes two tokens minted within the
/// same second distinct, so byte-equality against the cached pair is
/// meaningful.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub role: String,
    pub jti: Uuid,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn new_access(sub: Uuid, email: String, lifetime_seconds: i64) -> Self {
        Self::new(sub, email, ROLE_ACCESS, lifetime_seconds)
    }

    pub fn new_refresh(sub: Uuid, email: String, lifetime_seconds: i64) -> Self {
        Self::new(sub, email, ROLE_REFRESH, lifetime_seconds)
    }

    fn new(sub: Uuid, email: String, role: &str, lifetime_seconds: i64) -> Self {
        let now = Utc::now().timestamp();
        Self {
            sub,
            email,
            role: role.to_string(),
            jti: Uuid::new_v4(),
            iat: now,
            exp: now + lifetime_seconds,
        }
    }

    pub fn is_access(&self) -> bool {
        self.role == ROLE_ACCESS
    }

    pub fn is_refresh(&self) -> bool {
        self.role == ROLE_REFRESH
    }
}

/// An access/refresh token pair issued on sign-in, sign-up, or refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}
