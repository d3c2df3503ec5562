//! Logger module
//!
//! Provides logging utilities for the point server including:
//! - Subscriber setup (compact or JSON, stdout or file)
//! - Server lifecycle logging
//! - Access logging with multiple formats
//! - Ledger change logging

mod format;

pub use format::AccessLogEntry;

use std::fs::{File, OpenOptions};
use std::io;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

use crate::config::{Config, LogFormat, LoggingConfig};
use crate::point::TransactionType;
use crate::validation::FieldError;

/// Formatting layer chosen by `logging.format` and `logging.file`
type OutputLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Initialize the global subscriber
///
/// Should be called once at application startup. `RUST_LOG` takes
/// precedence over `logging.level`.
pub fn init(config: &LoggingConfig) -> io::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    tracing_subscriber::registry()
        .with(output_layer(config)?)
        .with(filter)
        .try_init()
        .map_err(io::Error::other)
}

fn output_layer(config: &LoggingConfig) -> io::Result<OutputLayer> {
    let file = config.file.as_deref().map(open_log_file).transpose()?;

    let layer = fmt::layer().with_target(false);
    Ok(match (config.format, file) {
        (LogFormat::Compact, None) => layer.compact().boxed(),
        (LogFormat::Compact, Some(file)) => layer
            .compact()
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .boxed(),
        (LogFormat::Json, None) => layer.json().boxed(),
        (LogFormat::Json, Some(file)) => layer.json().with_writer(Mutex::new(file)).boxed(),
    })
}

/// Open or create a log file for appending
fn open_log_file(path: &str) -> io::Result<File> {
    // Create parent directories if they don't exist
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    OpenOptions::new().create(true).append(true).open(path)
}

pub fn log_server_start(addr: &SocketAddr, config: &Config) {
    tracing::info!(
        %addr,
        workers = ?config.server.workers,
        max_body_size = config.http.max_body_size,
        max_connections = ?config.performance.max_connections,
        snapshot = ?config.storage.snapshot_file,
        "point server listening on http://{addr}"
    );
}

pub fn log_connection_accepted(peer_addr: &SocketAddr) {
    tracing::debug!(%peer_addr, "connection accepted");
}

pub fn log_connection_rejected(peer_addr: &SocketAddr, active: usize, max: u64) {
    tracing::warn!(%peer_addr, active, max, "max connections reached, connection rejected");
}

pub fn log_connection_error(err: &impl std::fmt::Debug) {
    tracing::error!("failed to serve connection: {err:?}");
}

pub fn log_connection_timeout(secs: u64) {
    tracing::warn!("connection timeout after {secs} seconds");
}

pub fn log_error(message: &str) {
    tracing::error!("{message}");
}

pub fn log_warning(message: &str) {
    tracing::warn!("{message}");
}

/// Log formatted access log entry
pub fn log_access(entry: &AccessLogEntry, format: &str) {
    tracing::info!(target: "access", "{}", entry.format(format));
}

pub fn log_validation_rejected(path: &str, errors: &[FieldError]) {
    let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
    tracing::debug!(path, ?fields, "request failed validation");
}

pub fn log_point_change(user_id: u64, kind: TransactionType, amount: u64, balance: u64) {
    tracing::info!(user_id, ?kind, amount, balance, "point balance changed");
}

pub fn log_snapshot_loaded(path: &Path, users: usize, histories: usize) {
    tracing::info!(path = %path.display(), users, histories, "ledger snapshot loaded");
}

pub fn log_shutdown_started(active: usize) {
    tracing::info!(active, "shutdown requested, no longer accepting connections");
}

pub fn log_shutdown_complete(remaining: usize) {
    if remaining == 0 {
        tracing::info!("all connections closed, shutdown complete");
    } else {
        tracing::warn!(remaining, "grace period elapsed, abandoning open connections");
    }
}
