//! API Gateway Library
//!
//! Terminates HTTP, fans a request out into a broker RPC to the identity
//! service or a gRPC call to the vision backend, and enforces the admission
//! guard on the vision endpoint.

pub mod broker_client;
pub mod clients;
pub mod config;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use tower_http::trace::TraceLayer;
use tracing::info;

use crate::broker_client::AmqpBrokerClient;
use crate::clients::VisionClient;
use crate::config::GatewayRuntimeConfig;
use crate::middleware::RateLimiter;
use crate::routes::create_router;
use crate::state::AppState;

/// Run the gateway as an embedded component (for the combined binary).
pub async fn run_embedded() -> Result<(), Box<dyn std::error::Error>> {
    let config = GatewayRuntimeConfig::from_env();
    run_server_with_config(config).await
}

/// Run the HTTP server with the given configuration.
async fn run_server_with_config(config: GatewayRuntimeConfig) -> Result<(), Box<dyn std::error::Error>> {
    let broker = Arc::new(AmqpBrokerClient::connect(&config.broker.amqps_uri(), &config.broker.queue).await?);
    let vision = Arc::new(VisionClient::connect(&config.vision.endpoint()).await?);
    let rate_limiter = Arc::new(RateLimiter::new(config.rate_limit.budget, config.rate_limit.window_seconds));

    let host = config.http.host.clone();
    let port = config.http.port;

    let state = AppState::new(broker, vision, rate_limiter, config);
    let app = create_router(state).layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Gateway listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;

    Ok(())
}
