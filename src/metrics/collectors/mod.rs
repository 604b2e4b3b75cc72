//! Built-in collectors and the options that assemble them into a pipeline.

mod bgp;
mod dhcp;
mod dhcp_lease;
mod firmware;
mod interface;
mod resource;
mod routes;
mod wlan_interface;
mod wlan_station;

pub use bgp::BgpCollector;
pub use dhcp::DhcpCollector;
pub use dhcp_lease::DhcpLeaseCollector;
pub use firmware::FirmwareCollector;
pub use interface::InterfaceCollector;
pub use resource::ResourceCollector;
pub use routes::RouteCollector;
pub use wlan_interface::WlanInterfaceCollector;
pub use wlan_station::WlanStationCollector;

use crate::config::Features;
use crate::error::{ExporterError, Result};
use crate::metrics::traits::{Collector, CollectorContext};
use crate::routeros::Sentence;
use std::sync::Arc;
use tracing::{error, warn};

/// Which optional collectors run after the always-on interface and
/// resource collectors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Options {
    pub bgp: bool,
    pub dhcp: bool,
    pub dhcp_leases: bool,
    pub firmware: bool,
    pub wlan_interfaces: bool,
    pub wlan_stations: bool,
    pub routes: bool,
}

impl From<Features> for Options {
    fn from(f: Features) -> Self {
        Self {
            bgp: f.bgp,
            dhcp: f.dhcp,
            dhcp_leases: f.dhcp_leases,
            firmware: f.firmware,
            wlan_interfaces: f.wlan_interfaces,
            wlan_stations: f.wlan_stations,
            routes: f.routes,
        }
    }
}

impl Options {
    /// Enable everything enabled in either set.
    pub fn union(self, other: Options) -> Self {
        Self {
            bgp: self.bgp || other.bgp,
            dhcp: self.dhcp || other.dhcp,
            dhcp_leases: self.dhcp_leases || other.dhcp_leases,
            firmware: self.firmware || other.firmware,
            wlan_interfaces: self.wlan_interfaces || other.wlan_interfaces,
            wlan_stations: self.wlan_stations || other.wlan_stations,
            routes: self.routes || other.routes,
        }
    }

    /// Build the ordered collector pipeline.
    pub fn build(self) -> Vec<Arc<dyn Collector>> {
        let mut collectors: Vec<Arc<dyn Collector>> = vec![
            Arc::new(InterfaceCollector::new()),
            Arc::new(ResourceCollector::new()),
        ];

        if self.bgp {
            collectors.push(Arc::new(BgpCollector::new()));
        }
        if self.dhcp {
            collectors.push(Arc::new(DhcpCollector::new()));
        }
        if self.dhcp_leases {
            collectors.push(Arc::new(DhcpLeaseCollector::new()));
        }
        if self.firmware {
            collectors.push(Arc::new(FirmwareCollector::new()));
        }
        if self.wlan_interfaces {
            collectors.push(Arc::new(WlanInterfaceCollector::new()));
        }
        if self.wlan_stations {
            collectors.push(Arc::new(WlanStationCollector::new()));
        }
        if self.routes {
            collectors.push(Arc::new(RouteCollector::new()));
        }

        collectors
    }
}

/// `=.proplist=` word restricting a print to the given properties.
pub(crate) fn proplist(props: &[&str]) -> String {
    format!("=.proplist={}", props.join(","))
}

/// Run a query for `collector`, logging and wrapping any failure.
pub(crate) async fn query<W: AsRef<str>>(
    ctx: &mut CollectorContext<'_>,
    collector: &'static str,
    words: &[W],
) -> Result<Vec<Sentence>> {
    match ctx.session.run(words).await {
        Ok(reply) => Ok(reply.re),
        Err(e) => {
            error!(
                device = %ctx.device.name,
                collector,
                error = %e,
                "error fetching metrics"
            );
            Err(ExporterError::collect_error(collector, e))
        }
    }
}

/// Parse a numeric property value. Empty values read as `None`.
pub(crate) fn parse_value(raw: &str) -> Option<std::result::Result<f64, std::num::ParseFloatError>> {
    let raw = raw.trim();
    if raw.is_empty() {
        None
    } else {
        Some(raw.parse())
    }
}

/// Look up and parse a numeric property, logging unparseable values.
pub(crate) fn numeric(
    ctx: &CollectorContext<'_>,
    record: &Sentence,
    prop: &str,
) -> Option<f64> {
    match parse_value(record.get(prop)?)? {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(
                device = %ctx.device.name,
                property = prop,
                value = record.get(prop).unwrap_or_default(),
                error = %e,
                "error parsing value"
            );
            None
        }
    }
}

/// Parse a RouterOS duration such as `1w2d3h4m5s`, `350ms` or `01:02:03`
/// into seconds.
pub fn parse_duration(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if raw.contains(':') {
        // [days d] hh:mm:ss as printed by older firmware
        let (days, clock) = match raw.split_once('d') {
            Some((days, clock)) => (days.trim().parse::<f64>().ok()?, clock.trim()),
            None => (0.0, raw),
        };
        let mut seconds = 0.0;
        for part in clock.split(':') {
            seconds = seconds * 60.0 + part.parse::<f64>().ok()?;
        }
        return Some(days * 86400.0 + seconds);
    }

    let mut total = 0.0;
    let mut number = String::new();
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        if c.is_ascii_digit() || c == '.' {
            number.push(c);
            continue;
        }
        let (mul, div) = match c {
            'w' => (604_800.0, 1.0),
            'd' => (86_400.0, 1.0),
            'h' => (3_600.0, 1.0),
            'm' if chars.peek() == Some(&'s') => {
                chars.next();
                (1.0, 1_000.0)
            }
            'm' => (60.0, 1.0),
            'u' if chars.peek() == Some(&'s') => {
                chars.next();
                (1.0, 1_000_000.0)
            }
            's' => (1.0, 1.0),
            _ => return None,
        };
        total += number.parse::<f64>().ok()? * mul / div;
        number.clear();
    }

    if !number.is_empty() {
        // a bare trailing number is seconds
        total += number.parse::<f64>().ok()?;
    }
    Some(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("1w2d3h4m5s"), Some(788_645.0));
        assert_eq!(parse_duration("9m58s"), Some(598.0));
        assert_eq!(parse_duration("350ms"), Some(0.35));
        assert_eq!(parse_duration("01:02:03"), Some(3_723.0));
        assert_eq!(parse_duration("2d01:00:00"), Some(176_400.0));
        assert_eq!(parse_duration(""), None);
        assert_eq!(parse_duration("never"), None);
    }

    #[test]
    fn test_parse_value() {
        assert_eq!(parse_value(" 42 ").unwrap().unwrap(), 42.0);
        assert!(parse_value("").is_none());
        assert!(parse_value("abc").unwrap().is_err());
    }

    #[test]
    fn test_options_pipeline_order() {
        let names: Vec<_> = Options::default()
            .build()
            .iter()
            .map(|c| c.name())
            .collect();
        assert_eq!(names, vec!["interface", "resource"]);

        let all = Options {
            bgp: true,
            dhcp: true,
            dhcp_leases: true,
            firmware: true,
            wlan_interfaces: true,
            wlan_stations: true,
            routes: true,
        };
        let names: Vec<_> = all.build().iter().map(|c| c.name()).collect();
        assert_eq!(
            names,
            vec![
                "interface",
                "resource",
                "bgp",
                "dhcp",
                "dhcp_leases",
                "firmware",
                "wlan_interfaces",
                "wlan_stations",
                "routes"
            ]
        );
    }

    #[test]
    fn test_options_union() {
        let from_flags = Options {
            bgp: true,
            ..Default::default()
        };
        let from_file = Options::from(Features {
            firmware: true,
            ..Default::default()
        });
        let merged = from_flags.union(from_file);
        assert!(merged.bgp && merged.firmware);
        assert!(!merged.dhcp);
    }

    #[test]
    fn test_descriptor_names_are_unique() {
        let all = Options {
            bgp: true,
            dhcp: true,
            dhcp_leases: true,
            firmware: true,
            wlan_interfaces: true,
            wlan_stations: true,
            routes: true,
        };
        let mut names: Vec<String> = all
            .build()
            .iter()
            .flat_map(|c| c.describe())
            .map(|d| d.name.clone())
            .collect();
        let total = names.len();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), total);
        assert!(names.iter().all(|n| n.starts_with("mikrotik_")));
    }
}
