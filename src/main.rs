//! RouterOS Exporter binary
//!
//! Serves Prometheus metrics scraped from RouterOS devices.

use anyhow::{anyhow, Context};
use clap::{Parser, ValueEnum};
use routeros_exporter::{
    start_web_server, Config, Options, Scraper, TransportOptions, WebConfig,
    DEFAULT_METRICS_PATH, DEFAULT_WEB_PORT,
};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "routeros_exporter")]
#[command(about = "Prometheus exporter for MikroTik RouterOS devices")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(
    long_about = "Scrapes RouterOS devices over the binary API on every request and serves the results in the Prometheus text format"
)]
struct Cli {
    /// Path to the YAML config file
    #[arg(long = "config-file")]
    config_file: Option<PathBuf>,

    /// Single device mode: device name
    #[arg(long, default_value = "")]
    device: String,

    /// Single device mode: address of the device
    #[arg(long, default_value = "")]
    address: String,

    /// Single device mode: user for authentication
    #[arg(long, default_value = "")]
    user: String,

    /// Single device mode: password for authentication
    #[arg(long, default_value = "")]
    password: String,

    /// Single device mode: API port of the device
    #[arg(long)]
    deviceport: Option<u16>,

    /// Web server bind address
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Web server port
    #[arg(long, default_value_t = DEFAULT_WEB_PORT)]
    port: u16,

    /// Path answering scrape requests
    #[arg(long, default_value = DEFAULT_METRICS_PATH)]
    path: String,

    /// Dial, TLS handshake, login, command and SRV lookup timeout in seconds
    #[arg(long, default_value_t = 5)]
    timeout: u64,

    /// Use the TLS API service
    #[arg(long)]
    tls: bool,

    /// Skip TLS certificate verification
    #[arg(long)]
    insecure: bool,

    /// Log level filter, overridden by RUST_LOG
    #[arg(long = "log-level", default_value = "info")]
    log_level: String,

    /// Log output format
    #[arg(long = "log-format", value_enum, default_value_t = LogFormat::Json)]
    log_format: LogFormat,

    /// Retrieve BGP session metrics
    #[arg(long = "with-bgp")]
    with_bgp: bool,

    /// Retrieve DHCP server lease counts
    #[arg(long = "with-dhcp")]
    with_dhcp: bool,

    /// Retrieve bound DHCP leases
    #[arg(long = "with-dhcpl")]
    with_dhcpl: bool,

    /// Retrieve routerboard firmware versions
    #[arg(long = "with-firmware")]
    with_firmware: bool,

    /// Retrieve wireless interface metrics
    #[arg(long = "with-wlanif")]
    with_wlanif: bool,

    /// Retrieve wireless station metrics
    #[arg(long = "with-wlansta")]
    with_wlansta: bool,

    /// Retrieve the routing table
    #[arg(long = "with-routes")]
    with_routes: bool,
}

impl Cli {
    fn options(&self) -> Options {
        Options {
            bgp: self.with_bgp,
            dhcp: self.with_dhcp,
            dhcp_leases: self.with_dhcpl,
            firmware: self.with_firmware,
            wlan_interfaces: self.with_wlanif,
            wlan_stations: self.with_wlansta,
            routes: self.with_routes,
        }
    }

    fn transport(&self) -> TransportOptions {
        TransportOptions {
            timeout: Duration::from_secs(self.timeout),
            use_tls: self.tls,
            insecure_tls: self.insecure,
        }
    }

    fn load_config(&self) -> routeros_exporter::Result<Config> {
        match &self.config_file {
            Some(path) => Config::load(path),
            None => Config::single_device(
                &self.device,
                &self.address,
                &self.user,
                &self.password,
                self.deviceport,
            ),
        }
    }

    fn web_config(&self) -> WebConfig {
        WebConfig::new(&self.host, self.port).with_metrics_path(&self.path)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing/logging
    init_logging(&cli)?;
    lazy_static::initialize(&routeros_exporter::STARTED_AT);

    if let Err(e) = serve(&cli).await {
        error!(error = %e, "exporter stopped");
        std::process::exit(1);
    }

    Ok(())
}

fn init_logging(cli: &Cli) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cli.log_level))
        .with_context(|| format!("invalid log level {:?}", cli.log_level))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    match cli.log_format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.compact().try_init(),
    }
    .map_err(|e| anyhow!("failed to install log subscriber: {}", e))
}

async fn serve(cli: &Cli) -> routeros_exporter::Result<()> {
    info!(version = env!("CARGO_PKG_VERSION"), "starting routeros_exporter");

    let config = cli.load_config()?;
    let options = cli.options().union(Options::from(config.features));
    let transport = cli.transport();

    info!(
        devices = config.devices.len(),
        tls = transport.use_tls,
        timeout_secs = transport.timeout.as_secs(),
        ?options,
        "configuration loaded"
    );

    let scraper = Scraper::builder(config.devices)
        .with_transport(transport)
        .with_options(options)
        .build()?;

    start_web_server(cli.web_config(), scraper).await
}
