//! Application configuration loaded from environment variables.

use std::time::Duration;

use checkout::PaymentConfig;

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST` — bind address (default: `"0.0.0.0"`)
/// - `PORT` — listen port (default: `3000`)
/// - `RUST_LOG` — tracing filter directive (default: `"info"`)
/// - `DATABASE_URL` — Postgres connection string; absent means the
///   in-memory store
/// - `JWT_SECRET` — credential signing secret
/// - `GATEWAY_KEY_SECRET` — gateway callback signing secret
/// - `CURRENCY` — settlement currency code (default: `"INR"`)
/// - `GATEWAY_TIMEOUT_MS` — gateway call bound (default: `5000`)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub gateway_secret: String,
    pub currency: String,
    pub gateway_timeout_ms: u64,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            log_level: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            database_url: std::env::var("DATABASE_URL").ok(),
            jwt_secret: std::env::var("JWT_SECRET").unwrap_or_else(|_| "dev_jwt_secret".to_string()),
            gateway_secret: std::env::var("GATEWAY_KEY_SECRET")
                .unwrap_or_else(|_| "dev_gateway_secret".to_string()),
            currency: std::env::var("CURRENCY").unwrap_or_else(|_| "INR".to_string()),
            gateway_timeout_ms: std::env::var("GATEWAY_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5000),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Returns the payment settings slice of this configuration.
    pub fn payment_config(&self) -> PaymentConfig {
        PaymentConfig {
            currency: self.currency.clone(),
            gateway_secret: self.gateway_secret.clone(),
            gateway_timeout: Duration::from_millis(self.gateway_timeout_ms),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            database_url: None,
            jwt_secret: "dev_jwt_secret".to_string(),
            gateway_secret: "dev_gateway_secret".to_string(),
            currency: "INR".to_string(),
            gateway_timeout_ms: 5000,
        }
    }
}
