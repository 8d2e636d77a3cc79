//! Combined binary for development - runs the identity service and the
//! gateway in one process.

use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "rust-api")]
#[command(about = "Combined microservices binary for development")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run all services in a single process (development mode)
    Serve,
    /// Run database migrations for the identity service
    Migrate {
        #[command(subcommand)]
        action: MigrateAction,
    },
}

#[derive(Subcommand, Clone, Copy)]
enum MigrateAction {
    /// Run pending migrations
    Up,
    /// Rollback last migration
    Down,
    /// Show migration status
    Status,
    /// Reset database and run all migrations
    Fresh,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve => {
            info!("Starting combined services in development mode");

            // Spawn the identity service first (it owns the database and
            // the broker consumer the gateway's RPC client depends on).
            let identity_handle = tokio::spawn(async move {
                if let Err(e) = identity_service_lib::run_embedded().await {
                    error!("Identity service failed: {}", e);
                }
            });

            tokio::time::sleep(std::time::Duration::from_millis(500)).await;

            let gateway_handle = tokio::spawn(async move {
                if let Err(e) = gateway_lib::run_embedded().await {
                    error!("Gateway failed: {}", e);
                }
            });

            tokio::select! {
                _ = identity_handle => {
                    error!("Identity service exited unexpectedly");
                }
                _ = gateway_handle => {
                    error!("Gateway exited unexpectedly");
                }
            }
        }
        Commands::Migrate { action } => {
            let migrate_action = match action {
                MigrateAction::Up => identity_service_lib::MigrateAction::Up,
                MigrateAction::Down => identity_service_lib::MigrateAction::Down,
                MigrateAction::Status => identity_service_lib::MigrateAction::Status,
                MigrateAction::Fresh => identity_service_lib::MigrateAction::Fresh,
            };

            identity_service_lib::run_migrations(migrate_action).await?;
        }
    }

    Ok(())
}
