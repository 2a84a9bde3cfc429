//! Server configuration loaded from environment variables.
//!
//! All settings have sensible defaults so the server can start with zero
//! configuration for local development.

use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;

use barakholka_shared::constants::{
    APP_NAME, DEFAULT_HTTP_PORT, DEFAULT_MESSAGE_BURST, DEFAULT_MESSAGE_RATE,
};

/// Server configuration.
#[derive(Clone)]
pub struct ServerConfig {
    /// Socket address for the HTTP (axum) API server.
    /// Env: `HTTP_ADDR`
    /// Default: `0.0.0.0:8080`
    pub http_addr: SocketAddr,

    /// SQLite database file.
    /// Env: `DATABASE_PATH`
    /// Default: `None` (platform data directory, see `Database::default_path`).
    pub database_path: Option<PathBuf>,

    /// Human-readable name for this instance, reported by `/health`.
    /// Env: `INSTANCE_NAME`
    /// Default: `"Barakholka"`
    pub instance_name: String,

    /// Bearer token for the directory sync API used by the identity and ad
    /// services.
    /// Env: `ADMIN_TOKEN`
    /// Default: empty (directory API disabled).
    pub admin_token: Option<String>,

    /// Sustained chat messages per second per user.
    /// Env: `MESSAGE_RATE_PER_SEC`
    pub message_rate: f64,

    /// Burst of chat messages per user.
    /// Env: `MESSAGE_BURST`
    pub message_burst: f64,
}

// Hand-written so the admin token never reaches the logs.
impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("http_addr", &self.http_addr)
            .field("database_path", &self.database_path)
            .field("instance_name", &self.instance_name)
            .field("admin_token", &self.admin_token.as_ref().map(|_| "<redacted>"))
            .field("message_rate", &self.message_rate)
            .field("message_burst", &self.message_burst)
            .finish()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], DEFAULT_HTTP_PORT).into(),
            database_path: None,
            instance_name: APP_NAME.to_string(),
            admin_token: None,
            message_rate: DEFAULT_MESSAGE_RATE,
            message_burst: DEFAULT_MESSAGE_BURST,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup. `from_env` passes the
    /// process environment; tests pass a map.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(addr) = lookup("HTTP_ADDR") {
            if let Ok(parsed) = addr.parse::<SocketAddr>() {
                config.http_addr = parsed;
            } else {
                tracing::warn!(
                    value = %addr,
                    "Invalid HTTP_ADDR, using default"
                );
            }
        }

        if let Some(path) = lookup("DATABASE_PATH") {
            if !path.is_empty() {
                config.database_path = Some(PathBuf::from(path));
            }
        }

        if let Some(name) = lookup("INSTANCE_NAME") {
            config.instance_name = name;
        }

        if let Some(token) = lookup("ADMIN_TOKEN") {
            if !token.is_empty() {
                config.admin_token = Some(token);
            }
        }

        if let Some(val) = lookup("MESSAGE_RATE_PER_SEC") {
            match parse_positive(&val) {
                Some(rate) => config.message_rate = rate,
                None => tracing::warn!(value = %val, "Invalid MESSAGE_RATE_PER_SEC, using default"),
            }
        }

        if let Some(val) = lookup("MESSAGE_BURST") {
            match parse_positive(&val) {
                Some(burst) if burst >= 1.0 => config.message_burst = burst,
                _ => tracing::warn!(value = %val, "Invalid MESSAGE_BURST, using default"),
            }
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter,
        // so we do not store it here.

        config
    }
}

fn parse_positive(val: &str) -> Option<f64> {
    val.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v > 0.0)
}
