//! Shared configuration structures.
//!
//! Each config struct carries a `Default` impl and a `from_env()` constructor
//! loaded via environment variables (see the individual field docs for the
//! variable names each one reads).

use std::env;

/// Gateway HTTP bind configuration (`GATEWAY_HOST`/`GATEWAY_PORT`).
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl GatewayConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: env::var("GATEWAY_HOST").unwrap_or(defaults.host),
            port: env::var("GATEWAY_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.port),
        }
    }
}

/// Redis cache configuration (`REDIS_HOST`, `REDIS_PORT`, `REDIS_PASSWORD`).
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub host: String,
    pub port: u16,
    pub password: Option<String>,
    pub default_ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 6379,
            password: None,
            default_ttl_seconds: 3600,
        }
    }
}

impl CacheConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: env::var("REDIS_HOST").unwrap_or(defaults.host),
            port: env::var("REDIS_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.port),
            password: env::var("REDIS_PASSWORD").ok().filter(|s| !s.is_empty()),
            default_ttl_seconds: defaults.default_ttl_seconds,
        }
    }

    /// Build a `redis://` connection URL from the host/port/password.
    pub fn url(&self) -> String {
        match &self.password {
            Some(password) => format!("redis://:{}@{}:{}", password, self.host, self.port),
            None => format!("redis://{}:{}", self.host, self.port),
        }
    }
}

/// Database configuration (`DB_HOST`, `DB_PORT`, `DB_USERNAME`, `DB_PASSWORD`, `DB_NAME`).
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub database: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            username: "postgres".to_string(),
            password: "password".to_string(),
            database: "identity".to_string(),
            max_connections: 10,
            min_connections: 1,
        }
    }
}

impl DatabaseConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: env::var("DB_HOST").unwrap_or(defaults.host),
            port: env::var("DB_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.port),
            username: env::var("DB_USERNAME").unwrap_or(defaults.username),
            password: env::var("DB_PASSWORD").unwrap_or(defaults.password),
            database: env::var("DB_NAME").unwrap_or(defaults.database),
            max_connections: defaults.max_connections,
            min_connections: defaults.min_connections,
        }
    }

    /// Build a `postgres://` connection URL.
    pub fn url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database
        )
    }
}

/// JWT signing configuration (`JWT_SECRET`).
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
        }
    }
}

impl JwtConfig {
    pub fn from_env() -> Self {
        Self {
            secret: env::var("JWT_SECRET").unwrap_or_default(),
        }
    }
}

/// Admission guard rate-limit configuration (`RATE_LIMIT_BUDGET`, `RATE_LIMIT_WINDOW_SECONDS`).
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum anonymous requests admitted per window.
    pub budget: u32,
    /// Window size in seconds.
    pub window_seconds: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            budget: domain::DEFAULT_RATE_LIMIT_BUDGET,
            window_seconds: domain::DEFAULT_RATE_LIMIT_WINDOW_SECONDS,
        }
    }
}

impl RateLimitConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            budget: env::var("RATE_LIMIT_BUDGET")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.budget),
            window_seconds: env::var("RATE_LIMIT_WINDOW_SECONDS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.window_seconds),
        }
    }
}

/// Message-broker connection configuration (`USER`, `PASS`, `HOST`, `QUEUE`).
///
/// Always connects over TLS; there is no plaintext `amqp://` fallback. Client
/// certificate material is not part of this struct — see the open-question
/// resolution in `DESIGN.md` for why.
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    pub user: String,
    pub pass: String,
    pub host: String,
    pub queue: String,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            user: "guest".to_string(),
            pass: "guest".to_string(),
            host: "localhost".to_string(),
            queue: "identity".to_string(),
        }
    }
}

impl BrokerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            user: env::var("USER").unwrap_or(defaults.user),
            pass: env::var("PASS").unwrap_or(defaults.pass),
            host: env::var("HOST").unwrap_or(defaults.host),
            queue: env::var("QUEUE").unwrap_or(defaults.queue),
        }
    }

    /// Build the `amqps://` URI the broker client connects with.
    pub fn amqps_uri(&self) -> String {
        format!("amqps://{}:{}@{}", self.user, self.pass, self.host)
    }
}

/// SMTP mail configuration (`MAIL_HOST`, `MAIL_PORT`, `MAIL_USER`, `MAIL_PASS`,
/// `URL_HOST`, `URL_PORT`).
#[derive(Debug, Clone)]
pub struct MailConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub pass: String,
    /// Public host the verification link points back at.
    pub url_host: String,
    /// Public port the verification link points back at.
    pub url_port: u16,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 587,
            user: String::new(),
            pass: String::new(),
            url_host: "localhost".to_string(),
            url_port: 3000,
        }
    }
}

impl MailConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: env::var("MAIL_HOST").unwrap_or(defaults.host),
            port: env::var("MAIL_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.port),
            user: env::var("MAIL_USER").unwrap_or(defaults.user),
            pass: env::var("MAIL_PASS").unwrap_or(defaults.pass),
            url_host: env::var("URL_HOST").unwrap_or(defaults.url_host),
            url_port: env::var("URL_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.url_port),
        }
    }

    /// Build the verification link embedded in the mailed message.
    pub fn verification_link(&self, key: &str) -> String {
        format!(
            "http://{}:{}/auth/verify?key={}",
            self.url_host, self.url_port, key
        )
    }
}

/// Vision backend gRPC client configuration (`VISION_HOST`, `VISION_PORT`).
#[derive(Debug, Clone)]
pub struct VisionConfig {
    pub host: String,
    pub port: u16,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 50061,
        }
    }
}

impl VisionConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: env::var("VISION_HOST").unwrap_or(defaults.host),
            port: env::var("VISION_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.port),
        }
    }

    /// Build the `http://` endpoint the vision client connects to.
    pub fn endpoint(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}
