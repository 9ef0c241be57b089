use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

use crate::metrics::DEFAULT_ALLOWED_METRICS;
use crate::session::identity::{DEFAULT_MAX_RESPONSE_SIZE, DEFAULT_TIMEOUT};

/// Configuration for the score service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    /// Openplanet token verification
    pub identity: IdentityConfig,
    pub auth: AuthConfig,
    pub scores: ScoreConfig,
    /// Edge cache lifetimes for the read endpoints
    pub cache: CacheConfig,
    pub logging: LoggingConfig,
    pub metrics: MetricsConfig,
    pub security: SecurityConfig,
    /// In-memory datastore and canned identities, for local plugin development
    pub dev_mode: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection string
    pub url: String,
    pub max_connections: u32,
    /// How long to wait for a pooled connection
    pub acquire_timeout: Duration,
    /// Upper bound for a single datastore call
    pub query_timeout: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    pub auth_url: String,
    /// Shared secret of the plugin, sent along with every token
    pub plugin_secret: String,
    pub timeout: Duration,
    pub max_response_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub token_expiry: Duration,
    /// Sign-in attempts per minute per client IP
    pub rate_limit_per_minute: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreConfig {
    pub cooldown: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub leaderboard_ttl: Duration,
    pub world_records_ttl: Duration,
    pub activity_ttl: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    pub level: String,
    /// Mask client addresses in request logs
    pub sanitize_logs: bool,
    /// Enable request/response logging
    pub log_requests: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    pub allowed: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Maximum request body size in bytes
    pub max_request_size: usize,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: 10,
            acquire_timeout: Duration::from_secs(5),
            query_timeout: Duration::from_secs(10),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            database: DatabaseConfig::default(),
            identity: IdentityConfig {
                auth_url: "https://openplanet.dev/api/auth/validate".to_string(),
                plugin_secret: String::new(), // Must be set via environment
                timeout: DEFAULT_TIMEOUT,
                max_response_size: DEFAULT_MAX_RESPONSE_SIZE,
            },
            auth: AuthConfig {
                token_expiry: Duration::from_secs(720 * 3600),
                rate_limit_per_minute: 10,
            },
            scores: ScoreConfig {
                cooldown: Duration::from_secs(10 * 60),
            },
            cache: CacheConfig {
                leaderboard_ttl: Duration::from_secs(5 * 60),
                world_records_ttl: Duration::from_secs(5 * 60),
                activity_ttl: Duration::from_secs(3600),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                sanitize_logs: true,
                log_requests: false,
            },
            metrics: MetricsConfig {
                allowed: DEFAULT_ALLOWED_METRICS.iter().map(|s| s.to_string()).collect(),
            },
            security: SecurityConfig {
                max_request_size: 1024 * 1024, // 1MB
            },
            dev_mode: false,
        }
    }
}

impl ServiceConfig {
    /// Load configuration from environment variables and validate it
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        // Unset and empty variables both mean "use the default"
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(dev_mode) = var("DEV_MODE") {
            config.dev_mode = parse_bool(&dev_mode).context("Invalid DEV_MODE value")?;
        }

        // Server configuration
        if let Some(host) = var("HOST") {
            config.server.host = host;
        }
        if let Some(port) = var("PORT") {
            config.server.port = parse_number(&port).context("Invalid PORT value")?;
        }

        // Database configuration
        if let Some(url) = var("DATABASE_URL") {
            config.database.url = url;
        }
        if let Some(max) = var("DATABASE_MAX_CONNECTIONS") {
            config.database.max_connections =
                parse_number(&max).context("Invalid DATABASE_MAX_CONNECTIONS value")?;
        }
        if let Some(timeout) = var("BACKEND_TIMEOUT") {
            let timeout = parse_duration(&timeout).context("Invalid BACKEND_TIMEOUT value")?;
            config.database.query_timeout = timeout;
            config.identity.timeout = timeout;
        }

        // Identity provider
        if let Some(url) = var("OPENPLANET_AUTH_URL") {
            config.identity.auth_url = url;
        }
        if let Some(secret) = var("OPENPLANET_PLUGIN_SECRET") {
            config.identity.plugin_secret = secret;
        }

        // Sessions and submissions
        if let Some(expiry) = var("SESSION_TOKEN_EXPIRY") {
            config.auth.token_expiry =
                parse_duration(&expiry).context("Invalid SESSION_TOKEN_EXPIRY value")?;
        }
        if let Some(limit) = var("AUTH_RATE_LIMIT") {
            config.auth.rate_limit_per_minute =
                parse_number(&limit).context("Invalid AUTH_RATE_LIMIT value")?;
        }
        if let Some(cooldown) = var("SCORE_COOLDOWN") {
            config.scores.cooldown =
                parse_duration(&cooldown).context("Invalid SCORE_COOLDOWN value")?;
        }

        // Cache lifetimes
        if let Some(ttl) = var("LEADERBOARD_CACHE_TTL") {
            config.cache.leaderboard_ttl =
                parse_duration(&ttl).context("Invalid LEADERBOARD_CACHE_TTL value")?;
        }
        if let Some(ttl) = var("WORLDRECORDS_CACHE_TTL") {
            config.cache.world_records_ttl =
                parse_duration(&ttl).context("Invalid WORLDRECORDS_CACHE_TTL value")?;
        }
        if let Some(ttl) = var("ACTIVITY_CACHE_TTL") {
            config.cache.activity_ttl =
                parse_duration(&ttl).context("Invalid ACTIVITY_CACHE_TTL value")?;
        }

        if let Some(allowed) = var("ALLOWED_METRICS") {
            config.metrics.allowed = allowed
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(String::from)
                .collect();
        }

        if let Some(size) = var("MAX_REQUEST_SIZE") {
            config.security.max_request_size =
                parse_number(&size).context("Invalid MAX_REQUEST_SIZE value")?;
        }

        // Logging configuration
        if let Some(level) = var("LOG_LEVEL") {
            config.logging.level = level.to_lowercase();
        }
        if let Some(log_requests) = var("LOG_REQUESTS") {
            config.logging.log_requests =
                parse_bool(&log_requests).context("Invalid LOG_REQUESTS value")?;
        }
        if let Some(sanitize) = var("SANITIZE_LOGS") {
            config.logging.sanitize_logs =
                parse_bool(&sanitize).context("Invalid SANITIZE_LOGS value")?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration for consistency
    pub fn validate(&self) -> Result<()> {
        if self.server.host.is_empty() {
            return Err(anyhow::anyhow!("Server host cannot be empty"));
        }

        if self.server.port == 0 {
            return Err(anyhow::anyhow!("Server port must be non-zero"));
        }

        if !matches!(
            self.logging.level.as_str(),
            "error" | "warn" | "info" | "debug" | "trace"
        ) {
            return Err(anyhow::anyhow!(
                "Invalid LOG_LEVEL value: {}",
                self.logging.level
            ));
        }

        if self.database.max_connections == 0 {
            return Err(anyhow::anyhow!("DATABASE_MAX_CONNECTIONS must be non-zero"));
        }

        if self.database.query_timeout.is_zero() {
            return Err(anyhow::anyhow!("BACKEND_TIMEOUT must be positive"));
        }

        if self.auth.token_expiry.is_zero() {
            return Err(anyhow::anyhow!("SESSION_TOKEN_EXPIRY must be positive"));
        }

        if self.security.max_request_size == 0 {
            return Err(anyhow::anyhow!("MAX_REQUEST_SIZE must be non-zero"));
        }

        if self.metrics.allowed.is_empty() {
            warn!("ALLOWED_METRICS is empty, every metric will be rejected");
        }

        // Dev mode runs without PostgreSQL and without the identity provider
        if self.dev_mode {
            return Ok(());
        }

        if self.database.url.is_empty() {
            return Err(anyhow::anyhow!(
                "DATABASE_URL environment variable is required"
            ));
        }

        if self.identity.plugin_secret.is_empty() {
            return Err(anyhow::anyhow!(
                "OPENPLANET_PLUGIN_SECRET environment variable is required"
            ));
        }

        Ok(())
    }
}

fn parse_number<T>(raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    Ok(raw.trim().parse::<T>()?)
}

/// Accepts the spellings `1 t true TRUE True` and their false counterparts
pub fn parse_bool(raw: &str) -> Result<bool> {
    match raw.trim() {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Ok(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Ok(false),
        other => Err(anyhow::anyhow!("expected a boolean, got {other:?}")),
    }
}

/// Parse a duration such as `90s`, `10m`, `720h`, `1h30m`, `1.5h` or `500ms`.
///
/// A bare `0` is accepted. Negative durations are not.
pub fn parse_duration(raw: &str) -> Result<Duration> {
    let raw = raw.trim();
    if raw == "0" {
        return Ok(Duration::ZERO);
    }
    if raw.is_empty() {
        return Err(anyhow::anyhow!("empty duration"));
    }

    let mut total = 0f64;
    let mut rest = raw;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .ok_or_else(|| anyhow::anyhow!("missing unit in duration {raw:?}"))?;
        if number_len == 0 {
            return Err(anyhow::anyhow!("invalid duration {raw:?}"));
        }
        let value: f64 = rest[..number_len]
            .parse()
            .with_context(|| format!("invalid number in duration {raw:?}"))?;
        rest = &rest[number_len..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let seconds_per_unit = match &rest[..unit_len] {
            "ns" => 1e-9,
            "us" | "µs" => 1e-6,
            "ms" => 1e-3,
            "s" => 1.0,
            "m" => 60.0,
            "h" => 3600.0,
            unit => return Err(anyhow::anyhow!("unknown unit {unit:?} in duration {raw:?}")),
        };
        rest = &rest[unit_len..];
        total += value * seconds_per_unit;
    }

    Duration::try_from_secs_f64(total).with_context(|| format!("duration out of range: {raw:?}"))
}
