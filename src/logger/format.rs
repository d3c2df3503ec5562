//! Access log format module
//!
//! Supports multiple log formats:
//! - `combined` (Apache/Nginx combined format)
//! - `common` (Common Log Format - CLF)
//! - `json` (one JSON object per line)

use chrono::Local;

/// Access log entry containing all request/response information
#[derive(Debug, Clone)]
pub struct AccessLogEntry {
    /// Client IP address
    pub remote_addr: String,
    /// Request timestamp
    pub time: chrono::DateTime<Local>,
    pub method: String,
    pub path: String,
    /// Query string (without leading ?)
    pub query: Option<String>,
    /// HTTP version (1.0, 1.1)
    pub http_version: String,
    pub status: u16,
    /// Response body size in bytes
    pub body_bytes: usize,
    pub user_agent: Option<String>,
    /// Request processing time in microseconds
    pub request_time_us: u64,
}

impl AccessLogEntry {
    /// Create a new access log entry with current timestamp
    pub fn new(remote_addr: String, method: String, path: String) -> Self {
        Self {
            remote_addr,
            time: Local::now(),
            method,
            path,
            query: None,
            http_version: "1.1".to_string(),
            status: 200,
            body_bytes: 0,
            user_agent: None,
            request_time_us: 0,
        }
    }

    /// Format the log entry; unknown formats fall back to `combined`
    pub fn format(&self, format: &str) -> String {
        match format {
            "common" => self.format_common(),
            "json" => self.format_json(),
            _ => self.format_combined(),
        }
    }

    fn request_line(&self) -> String {
        match &self.query {
            Some(q) => format!("{} {}?{q} HTTP/{}", self.method, self.path, self.http_version),
            None => format!("{} {} HTTP/{}", self.method, self.path, self.http_version),
        }
    }

    /// `$remote_addr - - [$time_local] "$request" $status $body_bytes_sent "$http_user_agent" $request_time`
    fn format_combined(&self) -> String {
        #[allow(clippy::cast_precision_loss)]
        let request_time = self.request_time_us as f64 / 1_000_000.0;
        format!(
            "{} \"{}\" {request_time:.3}",
            self.format_common(),
            self.user_agent.as_deref().unwrap_or("-"),
        )
    }

    /// `$remote_addr - - [$time_local] "$request" $status $body_bytes_sent`
    fn format_common(&self) -> String {
        format!(
            "{} - - [{}] \"{}\" {} {}",
            self.remote_addr,
            self.time.format("%d/%b/%Y:%H:%M:%S %z"),
            self.request_line(),
            self.status,
            self.body_bytes,
        )
    }

    fn format_json(&self) -> String {
        serde_json::json!({
            "remote_addr": self.remote_addr,
            "time": self.time.to_rfc3339(),
            "method": self.method,
            "path": self.path,
            "query": self.query,
            "http_version": self.http_version,
            "status": self.status,
            "body_bytes": self.body_bytes,
            "user_agent": self.user_agent,
            "request_time_us": self.request_time_us,
        })
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_entry() -> AccessLogEntry {
        let mut entry = AccessLogEntry::new(
            "10.0.0.7".to_string(),
            "PATCH".to_string(),
            "/point/1/charge".to_string(),
        );
        entry.query = Some("trace=1".to_string());
        entry.status = 409;
        entry.body_bytes = 118;
        entry.user_agent = Some("curl/8.5.0".to_string());
        entry.request_time_us = 12_000;
        entry
    }

    #[test]
    fn test_format_combined() {
        let log = create_test_entry().format("combined");
        assert!(log.contains("10.0.0.7"));
        assert!(log.contains("\"PATCH /point/1/charge?trace=1 HTTP/1.1\""));
        assert!(log.contains("409 118"));
        assert!(log.contains("curl/8.5.0"));
        assert!(log.ends_with("0.012"), "got: {log}");
    }

    #[test]
    fn test_format_common() {
        let log = create_test_entry().format("common");
        assert!(log.contains("409 118"));
        assert!(!log.contains("curl/8.5.0"));
    }

    #[test]
    fn test_format_json() {
        let log = create_test_entry().format("json");
        let value: serde_json::Value = serde_json::from_str(&log).unwrap();
        assert_eq!(value["method"], "PATCH");
        assert_eq!(value["status"], 409);
        assert_eq!(value["query"], "trace=1");
        assert_eq!(value["request_time_us"], 12_000);
    }

    #[test]
    fn test_unknown_format_falls_back() {
        let entry = create_test_entry();
        assert_eq!(entry.format("nginx-ish"), entry.format("combined"));
    }
}
