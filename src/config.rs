//! Exporter configuration: target devices and enabled collectors.

use crate::error::{ExporterError, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;

/// Top-level configuration, usually loaded from YAML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Devices to scrape
    #[serde(default)]
    pub devices: Vec<Device>,
    /// Optional collectors
    #[serde(default)]
    pub features: Features,
}

/// A configured scrape target.
///
/// Either `address` or `srv` is set. Devices carrying an SRV record are
/// templates: they are expanded into one concrete device per SRV answer at
/// the start of every scrape cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    /// Logical name used as the `device` label
    pub name: String,
    /// Host name or IP of the API endpoint
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub address: String,
    /// Discovery record; when present, `address` is ignored
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub srv: Option<SrvRecord>,
    /// API user
    pub user: String,
    /// API password
    pub password: String,
    /// API port; defaults to 8728, or 8729 with TLS
    #[serde(
        default,
        deserialize_with = "deserialize_port",
        skip_serializing_if = "Option::is_none"
    )]
    pub port: Option<u16>,
}

/// DNS SRV discovery settings for a device template.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SrvRecord {
    /// SRV record name, e.g. `_api._tcp.example.com`
    pub record: String,
    /// Resolver to ask instead of the system one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dns: Option<DnsServer>,
}

/// A custom DNS resolver endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsServer {
    pub address: String,
    #[serde(default = "default_dns_port")]
    pub port: u16,
}

fn default_dns_port() -> u16 {
    crate::DNS_PORT
}

/// Optional collector toggles as written in the config file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Features {
    pub bgp: bool,
    pub dhcp: bool,
    #[serde(alias = "dhcpl")]
    pub dhcp_leases: bool,
    pub firmware: bool,
    #[serde(alias = "wlanif")]
    pub wlan_interfaces: bool,
    #[serde(alias = "wlansta")]
    pub wlan_stations: bool,
    pub routes: bool,
}

// Older config files quote the port.
fn deserialize_port<'de, D>(deserializer: D) -> std::result::Result<Option<u16>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Port {
        Number(u16),
        Text(String),
    }

    match Option::<Port>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Port::Number(port)) => Ok(Some(port)),
        Some(Port::Text(text)) if text.trim().is_empty() => Ok(None),
        Some(Port::Text(text)) => text
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("invalid port {:?}", text))),
    }
}

impl Config {
    /// Parse a YAML document.
    pub fn from_yaml(text: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(text)
            .map_err(|e| ExporterError::config_error(format!("invalid YAML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a YAML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            ExporterError::config_error(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&text)
    }

    /// Build a configuration for exactly one statically addressed device.
    pub fn single_device(
        name: &str,
        address: &str,
        user: &str,
        password: &str,
        port: Option<u16>,
    ) -> Result<Self> {
        if name.is_empty() || address.is_empty() || user.is_empty() || password.is_empty() {
            return Err(ExporterError::config_error(
                "missing required param for single device configuration",
            ));
        }

        Ok(Self {
            devices: vec![Device {
                name: name.to_string(),
                address: address.to_string(),
                srv: None,
                user: user.to_string(),
                password: password.to_string(),
                port,
            }],
            features: Features::default(),
        })
    }

    /// Check every device entry for the fields a scrape needs.
    pub fn validate(&self) -> Result<()> {
        for (index, device) in self.devices.iter().enumerate() {
            if device.name.is_empty() {
                return Err(ExporterError::config_error(format!(
                    "device #{} has no name",
                    index
                )));
            }
            if device.user.is_empty() {
                return Err(ExporterError::config_error(format!(
                    "device {} has no user",
                    device.name
                )));
            }
            match &device.srv {
                Some(srv) if srv.record.is_empty() => {
                    return Err(ExporterError::config_error(format!(
                        "device {} has an empty srv record",
                        device.name
                    )));
                }
                Some(_) => {}
                None if device.address.is_empty() => {
                    return Err(ExporterError::config_error(format!(
                        "device {} needs an address or an srv record",
                        device.name
                    )));
                }
                None => {}
            }
        }
        Ok(())
    }
}

/// `host:port`, with IPv6 literals in brackets.
pub fn join_host_port(host: &str, port: u16) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("[{}]:{}", host, port)
    } else {
        format!("{}:{}", host, port)
    }
}

impl Device {
    /// The port to dial, falling back to the API default for the transport.
    pub fn port_or_default(&self, use_tls: bool) -> u16 {
        match self.port {
            Some(port) if port != 0 => port,
            _ if use_tls => crate::API_PORT_TLS,
            _ => crate::API_PORT,
        }
    }
}
