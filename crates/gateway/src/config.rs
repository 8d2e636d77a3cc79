//! Gateway configuration: aggregates the per-concern env-loaded structs from
//! `common` that the gateway's outbound connections need.

use common::{BrokerConfig, GatewayConfig as HttpConfig, RateLimitConfig, VisionConfig};

/// Full gateway runtime configuration.
#[derive(Debug, Clone)]
pub struct GatewayRuntimeConfig {
    pub http: HttpConfig,
    pub broker: BrokerConfig,
    pub vision: VisionConfig,
    pub rate_limit: RateLimitConfig,
}

impl GatewayRuntimeConfig {
    pub fn from_env() -> Self {
        Self {
            http: HttpConfig::from_env(),
            broker: BrokerConfig::from_env(),
            vision: VisionConfig::from_env(),
            rate_limit: RateLimitConfig::from_env(),
        }
    }
}
