//! Domain-level constants.
//!
//! These constants define business rules and validation requirements.

// =============================================================================
// Token claims
// =============================================================================

/// Claim value identifying an access token.
pub const ROLE_ACCESS: &str = "access";

/// Claim value identifying a refresh token.
pub const ROLE_REFRESH: &str = "refresh";

// =============================================================================
// Validation
// =============================================================================

/// Minimum password length requirement.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Maximum password length requirement.
pub const MAX_PASSWORD_LENGTH: usize = 128;

// =============================================================================
// Token & cache lifetimes
// =============================================================================

/// Access token lifetime, in hours.
pub const ACCESS_TOKEN_LIFETIME_HOURS: i64 = 12;

/// Refresh token lifetime, in hours. Also the TTL of the `jwt:<email>` cache entry.
pub const REFRESH_TOKEN_LIFETIME_HOURS: i64 = 24;

/// Verification key lifetime, in minutes. TTL of the `verify:<key>` cache entry.
pub const VERIFICATION_KEY_LIFETIME_MINUTES: i64 = 30;

/// Seconds per hour (for token expiration calculation).
pub const SECONDS_PER_HOUR: i64 = 3600;

/// Seconds per minute.
pub const SECONDS_PER_MINUTE: i64 = 60;

// =============================================================================
// Cache key families
// =============================================================================

/// Prefix for the `jwt:<email>` token-pair cache key family.
pub const CACHE_PREFIX_JWT: &str = "jwt:";

/// Prefix for the `verify:<key>` verification-key cache key family.
pub const CACHE_PREFIX_VERIFY: &str = "verify:";

// =============================================================================
// Admission guard
// =============================================================================

/// Default anonymous rate-limit budget per window.
pub const DEFAULT_RATE_LIMIT_BUDGET: u32 = 3;

/// Default anonymous rate-limit window, in seconds (1 hour).
pub const DEFAULT_RATE_LIMIT_WINDOW_SECONDS: u64 = 3600;

/// Header name the gateway reads a bearer token from (per the admission guard contract).
pub const ADMISSION_TOKEN_HEADER: &str = "token";
