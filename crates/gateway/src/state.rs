//! Application state for dependency injection.

use std::sync::Arc;

use crate::broker_client::BrokerClient;
use crate::clients::VisionBackend;
use crate::config::GatewayRuntimeConfig;
use crate::middleware::RateLimiter;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub broker: Arc<dyn BrokerClient>,
    pub vision: Arc<dyn VisionBackend>,
    pub rate_limiter: Arc<RateLimiter>,
    pub config: GatewayRuntimeConfig,
}

impl AppState {
    pub fn new(
        broker: Arc<dyn BrokerClient>,
        vision: Arc<dyn VisionBackend>,
        rate_limiter: Arc<RateLimiter>,
        config: GatewayRuntimeConfig,
    ) -> Self {
        Self {
            broker,
            vision,
            rate_limiter,
            config,
        }
    }
}
