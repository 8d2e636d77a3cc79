//! Identity service configuration, aggregated from the shared config structs.

use common::{BrokerConfig, CacheConfig, DatabaseConfig, JwtConfig, MailConfig};

/// Top-level identity service configuration, loaded once at process start.
#[derive(Debug, Clone)]
pub struct IdentityServiceConfig {
    pub database: DatabaseConfig,
    pub cache: CacheConfig,
    pub jwt: JwtConfig,
    pub mail: MailConfig,
    pub broker: BrokerConfig,
}

impl IdentityServiceConfig {
    pub fn from_env() -> Self {
        Self {
            database: DatabaseConfig::from_env(),
            cache: CacheConfig::from_env(),
            jwt: JwtConfig::from_env(),
            mail: MailConfig::from_env(),
            broker: BrokerConfig::from_env(),
        }
    }
}
