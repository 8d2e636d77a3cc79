//! Identity Service Library
//!
//! Orchestrates sign-up, sign-in, token refresh, token validation, and
//! email verification. Reachable only over the message broker — it exposes
//! no HTTP or gRPC surface of its own.

pub mod broker;
pub mod cache;
pub mod config;
pub mod infra;
pub mod mail;
pub mod repository;
pub mod service;
pub mod token_codec;

use std::sync::Arc;

use tracing::info;

use crate::cache::RedisTokenCache;
use crate::config::IdentityServiceConfig;
use crate::infra::Database;
use crate::mail::LettreMailDispatcher;
use crate::repository::SeaOrmCredentialStore;
use crate::service::IdentityOrchestrator;
use crate::token_codec::TokenCodec;

/// Run the identity service as an embedded component (for the combined binary).
pub async fn run_embedded() -> Result<(), Box<dyn std::error::Error>> {
    let config = IdentityServiceConfig::from_env();
    run_with_config(config).await
}

/// Run migrations (for CLI commands).
pub async fn run_migrations(action: MigrateAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = IdentityServiceConfig::from_env();
    let db = Database::connect_without_migrations(&config.database.url()).await?;

    match action {
        MigrateAction::Up => {
            db.run_migrations().await?;
            info!("Migrations applied successfully");
        }
        MigrateAction::Down => {
            db.rollback_migration().await?;
            info!("Rolled back last migration");
        }
        MigrateAction::Status => {
            let status = db.migration_status().await?;
            for (name, applied) in status {
                let marker = if applied { "[x]" } else { "[ ]" };
                println!("{} {}", marker, name);
            }
        }
        MigrateAction::Fresh => {
            db.fresh_migrations().await?;
            info!("Database reset and migrations applied");
        }
    }

    Ok(())
}

/// Migration action type.
#[derive(Debug, Clone, Copy)]
pub enum MigrateAction {
    Up,
    Down,
    Status,
    Fresh,
}

async fn run_with_config(config: IdentityServiceConfig) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::connect(&config.database.url()).await?;
    let store = Arc::new(SeaOrmCredentialStore::new(db.get_connection()));

    let cache = Arc::new(RedisTokenCache::connect(&config.cache.url()).await?);
    let codec = Arc::new(TokenCodec::new(config.jwt.secret.clone()));
    let mail = Arc::new(LettreMailDispatcher::new(config.mail.clone()));

    let service = Arc::new(IdentityOrchestrator::new(store, cache, codec, mail));

    info!(queue = %config.broker.queue, "Identity service listening on broker queue");
    broker::run(config.broker, service).await?;

    Ok(())
}
