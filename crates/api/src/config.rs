//! Application configuration loaded from environment variables.

use std::time::Duration;

use relay::RelayConfig;

/// Server and relay configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST` — bind address (default: `"0.0.0.0"`)
/// - `PORT` — listen port (default: `3000`)
/// - `RUST_LOG` — tracing filter directive (default: `"info"`)
/// - `OUTBOX_BATCH_SIZE` — records drained per relay tick (default: `10`)
/// - `OUTBOX_PERIOD_MS` — relay poll interval (default: `5000`)
/// - `HANDLER_TIMEOUT_MS` — per-handler deadline, unset means none
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub outbox_batch_size: usize,
    pub outbox_period: Duration,
    pub handler_timeout: Option<Duration>,
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
            outbox_batch_size: std::env::var("OUTBOX_BATCH_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
            outbox_period: std::env::var("OUTBOX_PERIOD_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(Duration::from_secs(5)),
            handler_timeout: std::env::var("HANDLER_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Relay tuning derived from this configuration.
    pub fn relay_config(&self) -> RelayConfig {
        RelayConfig {
            batch_size: self.outbox_batch_size,
            period: self.outbox_period,
            handler_timeout: self.handler_timeout,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            outbox_batch_size: 10,
            outbox_period: Duration::from_secs(5),
            handler_timeout: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let config = Config::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.outbox_batch_size, 10);
        assert_eq!(config.outbox_period, Duration::from_secs(5));
        assert!(config.handler_timeout.is_none());
    }

    #[test]
    fn addr_formatting() {
        let config = Config {
            host: "127.0.0.1".to_string(),
            port: 8080,
            ..Config::default()
        };
        assert_eq!(config.addr(), "127.0.0.1:8080");
    }

    #[test]
    fn relay_config_mirrors_settings() {
        let config = Config {
            outbox_batch_size: 3,
            outbox_period: Duration::from_millis(250),
            handler_timeout: Some(Duration::from_millis(100)),
            ..Config::default()
        };
        let relay = config.relay_config();
        assert_eq!(relay.batch_size, 3);
        assert_eq!(relay.period, Duration::from_millis(250));
        assert_eq!(relay.handler_timeout, Some(Duration::from_millis(100)));
    }
}
