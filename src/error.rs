//! Error handling for the RouterOS exporter.

/// A specialized `Result` type for exporter operations.
pub type Result<T> = std::result::Result<T, ExporterError>;

/// The main error type for exporter operations.
///
/// The first four variants are the per-device failure kinds of a scrape
/// cycle. They never escape a device's unit of work: the scraper turns them
/// into a `success=0` sample and a log line.
#[derive(Debug, thiserror::Error)]
pub enum ExporterError {
    /// SRV lookup for a discovery record failed
    #[error("discovery of {record} failed: {message}")]
    Discovery { record: String, message: String },

    /// Dial or TLS handshake failed or timed out
    #[error("connecting to {address} failed: {message}")]
    Connect { address: String, message: String },

    /// Login rejected or the challenge could not be answered
    #[error("authentication failed: {0}")]
    Auth(String),

    /// A collector's device query failed or returned unusable data
    #[error("{collector} collector failed: {message}")]
    Collect {
        collector: &'static str,
        message: String,
    },

    /// The device answered with `!trap`/`!fatal` or a malformed sentence
    #[error("API error: {0}")]
    Protocol(String),

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Sample or exposition error
    #[error("Metric error: {0}")]
    Metric(String),

    /// Web server error
    #[error("Web server error: {0}")]
    WebServer(String),
}

impl ExporterError {
    /// Create a new discovery error
    pub fn discovery_error(record: impl Into<String>, msg: impl ToString) -> Self {
        Self::Discovery {
            record: record.into(),
            message: msg.to_string(),
        }
    }

    /// Create a new connect error
    pub fn connect_error(address: impl Into<String>, msg: impl ToString) -> Self {
        Self::Connect {
            address: address.into(),
            message: msg.to_string(),
        }
    }

    /// Create a new authentication error
    pub fn auth_error(msg: impl Into<String>) -> Self {
        Self::Auth(msg.into())
    }

    /// Create a new collect error
    pub fn collect_error(collector: &'static str, msg: impl ToString) -> Self {
        Self::Collect {
            collector,
            message: msg.to_string(),
        }
    }

    /// Create a new protocol error
    pub fn protocol_error(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    /// Create a new configuration error
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new metric error
    pub fn metric_error(msg: impl Into<String>) -> Self {
        Self::Metric(msg.into())
    }

    /// Create a new web server error
    pub fn web_server_error(msg: impl Into<String>) -> Self {
        Self::WebServer(msg.into())
    }
}
