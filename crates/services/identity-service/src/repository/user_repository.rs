//! Credential store: the persistent mapping from email to user record.

use async_trait::async_trait;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set, SqlErr};
use uuid::Uuid;

use super::entities::user::{self, ActiveModel, Entity as UserEntity};
use common::{AppError, AppResult};
use domain::User;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Credential store trait for dependency injection.
///
/// Uniqueness on `email` is enforced by the store: a concurrent duplicate
/// `insert` surfaces as `AppError::Conflict` rather than a driver-level
/// constraint violation leaking through.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Find a user by email.
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>>;

    /// Insert a new user. Fails with `Conflict` if the email already exists.
    async fn insert(&self, user: User) -> AppResult<User>;

    /// Mark a user verified by ID.
    async fn update_verified(&self, id: Uuid, verified: bool) -> AppResult<()>;
}

/// SeaORM-backed implementation of the credential store.
pub struct SeaOrmCredentialStore {
    db: DatabaseConnection,
}

impl SeaOrmCredentialStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CredentialStore for SeaOrmCredentialStore {
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let result = UserEntity::find()
            .filter(user::Column::Email.eq(email))
            .one(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(result.map(User::from))
    }

    async fn insert(&self, user: User) -> AppResult<User> {
        let active_model = ActiveModel {
            id: Set(user.id),
            email: Set(user.email),
            password_hash: Set(user.password_hash),
            firstname: Set(user.firstname),
            lastname: Set(user.lastname),
            is_verified: Set(user.is_verified),
            created_at: Set(user.created_at),
            updated_at: Set(user.updated_at),
        };

        // No pre-check here: the unique index on email is the only arbiter,
        // so two racing sign-ups resolve to exactly one row and one Conflict.
        let model = active_model
            .insert(&self.db)
            .await
            .map_err(insert_error)?;
        Ok(User::from(model))
    }

    async fn update_verified(&self, id: Uuid, verified: bool) -> AppResult<()> {
        let existing = UserEntity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(AppError::from)?
            .ok_or(AppError::NotFound)?;

        let mut active: ActiveModel = existing.into();
        active.is_verified = Set(verified);
        active.updated_at = Set(chrono::Utc::now());

        active.update(&self.db).await.map_err(AppError::from)?;
        Ok(())
    }
}

fn insert_error(err: DbErr) -> AppError {
    classify_insert_error(err.sql_err(), err)
}

/// A unique hit on the email index is the loser of a concurrent sign-up and
/// surfaces as `Conflict`; anything else stays a database error.
fn classify_insert_error(sql_err: Option<SqlErr>, err: DbErr) -> AppError {
    match sql_err {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            AppError::conflict("User with such email already exists")
        }
        _ => AppError::from(err),
    }
}
