//! Environment-driven application configuration.

use std::net::SocketAddr;
use std::time::Duration;

use tracing::warn;
use url::Url;

/// Default HTTP bind address.
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
/// Default browser origin allowed to open WebSocket connections.
const DEFAULT_ALLOWED_ORIGIN: &str = "http://localhost:3000";
/// Default task retention: 30 days.
const DEFAULT_TASK_RETENTION_SECS: u64 = 60 * 60 * 24 * 30;

/// Error raised when an environment value cannot be used.
#[derive(Debug, thiserror::Error)]
#[error("invalid {name}: {message}")]
pub struct ConfigError {
    name: &'static str,
    message: String,
}

impl ConfigError {
    fn new(name: &'static str, message: impl Into<String>) -> Self {
        Self {
            name,
            message: message.into(),
        }
    }
}

/// Runtime configuration resolved at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Address the HTTP server binds to (`BIND_ADDR`).
    pub bind_addr: SocketAddr,
    /// Redis connection URL (`REDIS_URL`). Absent means single-instance
    /// mode on in-memory adapters.
    pub redis_url: Option<String>,
    /// Secret validating bearer credential signatures (`JWT_SECRET`).
    pub jwt_secret: String,
    /// Retention TTL applied to task documents (`TASK_RETENTION_SECS`).
    pub task_retention: Duration,
    /// Browser origins allowed on the WebSocket endpoint
    /// (`ALLOWED_ORIGINS`, comma separated).
    pub allowed_origins: Vec<Url>,
}

impl AppConfig {
    /// Resolve configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Resolve configuration through `lookup`, usable with any source of
    /// variables.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let bind_addr = lookup("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_owned())
            .parse()
            .map_err(|error| ConfigError::new("BIND_ADDR", format!("{error}")))?;

        let redis_url = lookup("REDIS_URL").filter(|value| !value.is_empty());

        let jwt_secret = lookup("JWT_SECRET")
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| {
                warn!("JWT_SECRET is not set; using the development secret");
                "dev-secret".to_owned()
            });

        let task_retention = match lookup("TASK_RETENTION_SECS") {
            Some(raw) => Duration::from_secs(
                raw.parse()
                    .map_err(|error| ConfigError::new("TASK_RETENTION_SECS", format!("{error}")))?,
            ),
            None => Duration::from_secs(DEFAULT_TASK_RETENTION_SECS),
        };

        let allowed_origins = lookup("ALLOWED_ORIGINS")
            .unwrap_or_else(|| DEFAULT_ALLOWED_ORIGIN.to_owned())
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(|origin| {
                Url::parse(origin)
                    .map_err(|error| ConfigError::new("ALLOWED_ORIGINS", format!("{origin}: {error}")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            bind_addr,
            redis_url,
            jwt_secret,
            task_retention,
            allowed_origins,
        })
    }
}
