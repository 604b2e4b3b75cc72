//! Web server configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the metrics web server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    /// Host to bind the server to
    pub host: String,
    /// Port to bind the server to
    pub port: u16,
    /// Path answering scrape requests
    pub metrics_path: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: crate::DEFAULT_WEB_PORT,
            metrics_path: crate::DEFAULT_METRICS_PATH.to_string(),
        }
    }
}

impl WebConfig {
    /// Create a new web configuration with custom host and port.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// Set the host for the web server.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the port for the web server.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the metrics path; a missing leading slash is added.
    pub fn with_metrics_path(mut self, path: impl Into<String>) -> Self {
        let path = path.into();
        self.metrics_path = if path.starts_with('/') {
            path
        } else {
            format!("/{}", path)
        };
        self
    }

    /// Get the full bind address.
    pub fn bind_address(&self) -> String {
        crate::config::join_host_port(&self.host, self.port)
    }
}
