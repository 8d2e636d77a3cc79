//! User domain entity and related types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User domain entity.
///
/// Invariants: `email` is unique across all records; `password_hash` is never
/// stored alongside a plaintext form; `is_verified` never reverts once true.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub firstname: String,
    pub lastname: String,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new, unverified user.
    pub fn new(
        id: Uuid,
        email: String,
        password_hash: String,
        firstname: String,
        lastname: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            email,
            password_hash,
            firstname,
            lastname,
            is_verified: false,
            created_at: now,
            updated_at: now,
        }
    }
}
