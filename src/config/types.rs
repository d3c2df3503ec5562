// Configuration types module
// Defines all configuration-related data structures

use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub performance: PerformanceConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub health: HealthConfig,
    #[serde(default)]
    pub points: PointsConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Server configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Tokio worker threads (defaults to CPU cores)
    #[serde(default)]
    pub workers: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            workers: None,
        }
    }
}

/// Log output format
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

/// Logging configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Filter directive, e.g. "info" or "point_server=debug"
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
    pub access_log: bool,
    /// Access log line format (combined, common or json)
    #[serde(default = "default_access_log_format")]
    pub access_log_format: String,
    /// Log file path (optional, stdout if not set)
    #[serde(default)]
    pub file: Option<String>,
}

#[allow(clippy::missing_const_for_fn)]
fn default_access_log_format() -> String {
    "combined".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
            access_log: true,
            access_log_format: default_access_log_format(),
            file: None,
        }
    }
}

/// Performance configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PerformanceConfig {
    pub keep_alive: bool,
    pub read_timeout: u64,
    pub write_timeout: u64,
    #[serde(default)]
    pub max_connections: Option<u64>,
    /// Seconds to wait for in-flight connections on shutdown
    pub shutdown_grace: u64,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            keep_alive: true,
            read_timeout: 30,
            write_timeout: 30,
            max_connections: None,
            shutdown_grace: 10,
        }
    }
}

/// HTTP configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct HttpConfig {
    pub server_name: String,
    pub enable_cors: bool,
    pub max_body_size: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            server_name: "point-server/0.1".to_string(),
            enable_cors: false,
            max_body_size: 65_536,
        }
    }
}

/// Health check configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct HealthConfig {
    /// Enable health check endpoints
    #[serde(default = "default_health_enabled")]
    pub enabled: bool,
    /// Liveness probe path (default: /healthz)
    #[serde(default = "default_healthz_path")]
    pub liveness_path: String,
    /// Readiness probe path (default: /readyz)
    #[serde(default = "default_readyz_path")]
    pub readiness_path: String,
}

#[allow(clippy::missing_const_for_fn)]
fn default_health_enabled() -> bool {
    true
}

#[allow(clippy::missing_const_for_fn)]
fn default_healthz_path() -> String {
    "/healthz".to_string()
}

#[allow(clippy::missing_const_for_fn)]
fn default_readyz_path() -> String {
    "/readyz".to_string()
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            enabled: default_health_enabled(),
            liveness_path: default_healthz_path(),
            readiness_path: default_readyz_path(),
        }
    }
}

/// Point ledger rules
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PointsConfig {
    /// Largest amount accepted by a single charge or use
    pub max_amount: u64,
    /// Largest balance a user may hold
    pub max_balance: u64,
    /// Treat unknown users as empty accounts instead of 404
    pub auto_create_users: bool,
    /// Reject request bodies carrying fields other than `amount`
    pub deny_unknown_fields: bool,
}

impl Default for PointsConfig {
    fn default() -> Self {
        Self {
            max_amount: 1_000_000,
            max_balance: 10_000_000,
            auto_create_users: true,
            deny_unknown_fields: false,
        }
    }
}

/// Ledger persistence
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct StorageConfig {
    /// TOML snapshot written after every mutation (in-memory only if unset)
    #[serde(default)]
    pub snapshot_file: Option<String>,
}
