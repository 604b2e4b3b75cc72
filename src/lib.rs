//! # RouterOS Exporter
//!
//! Scrapes MikroTik RouterOS appliances over the binary API and exposes the
//! results in the Prometheus text format.
//!
//! ## Features
//!
//! - **Device discovery**: static devices or DNS SRV records, named by each
//!   router's own identity
//! - **Session login**: post-6.43 plaintext login with a fallback to the
//!   legacy MD5 challenge, over TCP or TLS
//! - **Collector plugins**: interfaces and system resources always, BGP,
//!   DHCP, firmware, wireless and routes on demand
//! - **Concurrent scrapes**: every device is scraped in parallel and one
//!   failing router never hides the others
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use routeros_exporter::{start_web_server, Config, Options, Scraper, WebConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load("config.yml")?;
//!     let scraper = Scraper::builder(config.devices)
//!         .with_options(Options::from(config.features))
//!         .build()?;
//!
//!     start_web_server(WebConfig::default(), scraper).await?;
//!     Ok(())
//! }
//! ```

use std::time::Duration;

pub mod config;
pub mod discovery;
pub mod error;
pub mod metrics;
pub mod routeros;
pub mod web;

// Re-export public API
pub use config::{Config, Device, DnsServer, Features, SrvRecord};
pub use discovery::{DeviceResolver, DnsSrvResolver, SrvResolver, SrvTarget};
pub use error::{ExporterError, Result};
pub use metrics::{
    Collector, CollectorContext, Descriptor, MetricSink, Options, Sample, ScrapeOutcome, Scraper,
};
pub use routeros::{Connector, Session, TransportOptions};
pub use web::{start_web_server, WebConfig};

/// Prefix of every exported metric name
pub const NAMESPACE: &str = "mikrotik";

/// Plaintext API port
pub const API_PORT: u16 = 8728;

/// API-over-TLS port
pub const API_PORT_TLS: u16 = 8729;

/// Port used for custom SRV name servers that omit one
pub const DNS_PORT: u16 = 53;

/// Dial, handshake and lookup deadline unless configured otherwise
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// The default web server port
pub const DEFAULT_WEB_PORT: u16 = 9436;

/// The default scrape path
pub const DEFAULT_METRICS_PATH: &str = "/metrics";

lazy_static::lazy_static! {
    /// When this process started, shown on the landing page
    pub static ref STARTED_AT: chrono::DateTime<chrono::Utc> = chrono::Utc::now();
}
