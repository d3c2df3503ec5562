// Configuration module entry point
// Loads application configuration and holds the shared runtime state

mod state;
mod types;

use std::net::SocketAddr;

use crate::point::MAX_LEDGER_VALUE;

// Re-export public types
pub use state::AppState;
pub use types::{Config, HealthConfig, HttpConfig, LogFormat, LoggingConfig, PointsConfig};

/// Default config file name (without extension)
pub const DEFAULT_CONFIG_PATH: &str = "config";

impl Config {
    /// Load configuration from specified file path (without extension)
    ///
    /// Sources, lowest priority first: built-in defaults, the config file
    /// (optional), then `POINT__SECTION__KEY` environment variables.
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "compact")?
            .set_default("logging.access_log", true)?
            .set_default("logging.access_log_format", "combined")?
            .set_default("performance.keep_alive", true)?
            .set_default("performance.read_timeout", 30)?
            .set_default("performance.write_timeout", 30)?
            .set_default("performance.shutdown_grace", 10)?
            .set_default("http.server_name", "point-server/0.1")?
            .set_default("http.enable_cors", false)?
            .set_default("http.max_body_size", 65_536)? // 64KB
            .set_default("health.enabled", true)?
            .set_default("health.liveness_path", "/healthz")?
            .set_default("health.readiness_path", "/readyz")?
            .set_default("points.max_amount", 1_000_000)?
            .set_default("points.max_balance", 10_000_000)?
            .set_default("points.auto_create_users", true)?
            .set_default("points.deny_unknown_fields", false)?
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix("POINT")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let cfg: Self = settings.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject values the server cannot run with
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        let fail = |msg: String| Err(config::ConfigError::Message(msg));

        if self.server.port == 0 {
            return fail("server.port must be non-zero".to_string());
        }
        if self.server.workers == Some(0) {
            return fail("server.workers must be at least 1".to_string());
        }
        if self.http.server_name.trim().is_empty() {
            return fail("http.server_name must not be empty".to_string());
        }
        if self.points.max_amount == 0 {
            return fail("points.max_amount must be at least 1".to_string());
        }
        if self.points.max_balance > MAX_LEDGER_VALUE {
            return fail(format!(
                "points.max_balance must not exceed {MAX_LEDGER_VALUE}, got {}",
                self.points.max_balance
            ));
        }
        if self.points.max_amount > self.points.max_balance {
            return fail(format!(
                "points.max_amount ({}) exceeds points.max_balance ({})",
                self.points.max_amount, self.points.max_balance
            ));
        }
        for (key, path) in [
            ("health.liveness_path", &self.health.liveness_path),
            ("health.readiness_path", &self.health.readiness_path),
        ] {
            if !path.starts_with('/') {
                return fail(format!("{key} must start with '/', got '{path}'"));
            }
        }
        Ok(())
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }
}
