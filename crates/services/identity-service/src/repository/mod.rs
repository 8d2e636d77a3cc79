//! Repository layer for data access.

pub mod entities;
mod user_repository;

pub use user_repository::{CredentialStore, SeaOrmCredentialStore};

#[cfg(any(test, feature = "test-utils"))]
pub use user_repository::MockCredentialStore;
