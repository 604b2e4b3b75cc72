//! Expands the configured device list into the concrete devices of one
//! scrape cycle, resolving SRV-record templates through DNS.

use crate::config::{Device, DnsServer};
use crate::error::{ExporterError, Result};
use crate::routeros::Connector;
use async_trait::async_trait;
use futures_util::future::join_all;
use hickory_resolver::config::{NameServerConfigGroup, ResolverConfig};
use hickory_resolver::name_server::TokioConnectionProvider;
use hickory_resolver::{Resolver, TokioResolver};
use std::net::IpAddr;
use std::time::Duration;
use tokio::sync::OnceCell;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

/// One answer of an SRV query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SrvTarget {
    /// Target host as returned, possibly with a trailing root dot
    pub target: String,
    pub port: u16,
}

/// Answers SRV queries, either through the system resolver or a custom one.
#[async_trait]
pub trait SrvResolver: Send + Sync {
    async fn lookup_srv(&self, record: &str, dns: Option<&DnsServer>) -> Result<Vec<SrvTarget>>;
}

/// [`SrvResolver`] backed by hickory.
///
/// The system resolver is created on first use, so configs without SRV
/// entries never read the host's resolver configuration.
pub struct DnsSrvResolver {
    timeout: Duration,
    system: OnceCell<TokioResolver>,
}

impl DnsSrvResolver {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            system: OnceCell::new(),
        }
    }

    async fn system_resolver(&self) -> Result<&TokioResolver> {
        self.system
            .get_or_try_init(|| async {
                TokioResolver::builder_tokio()
                    .map(|builder| builder.build())
                    .map_err(|e| ExporterError::config_error(format!("system resolver: {}", e)))
            })
            .await
    }

    fn custom_resolver(dns: &DnsServer) -> Result<TokioResolver> {
        let ip: IpAddr = dns.address.parse().map_err(|e| {
            ExporterError::config_error(format!("invalid DNS server {:?}: {}", dns.address, e))
        })?;
        let servers = NameServerConfigGroup::from_ips_clear(&[ip], dns.port, true);
        let config = ResolverConfig::from_parts(None, vec![], servers);
        Ok(Resolver::builder_with_config(config, TokioConnectionProvider::default()).build())
    }
}

#[async_trait]
impl SrvResolver for DnsSrvResolver {
    async fn lookup_srv(&self, record: &str, dns: Option<&DnsServer>) -> Result<Vec<SrvTarget>> {
        let fqdn = if record.ends_with('.') {
            record.to_string()
        } else {
            format!("{}.", record)
        };

        let custom;
        let resolver = match dns {
            Some(dns) => {
                info!(dns_server = %format!("{}:{}", dns.address, dns.port), "custom DNS config detected");
                custom = Self::custom_resolver(dns)
                    .map_err(|e| ExporterError::discovery_error(record, e))?;
                &custom
            }
            None => self
                .system_resolver()
                .await
                .map_err(|e| ExporterError::discovery_error(record, e))?,
        };

        let answers = timeout(self.timeout, resolver.srv_lookup(fqdn.as_str()))
            .await
            .map_err(|_| ExporterError::discovery_error(record, "SRV lookup timed out"))?
            .map_err(|e| ExporterError::discovery_error(record, e))?;

        Ok(answers
            .iter()
            .map(|srv| SrvTarget {
                target: srv.target().to_utf8(),
                port: srv.port(),
            })
            .collect())
    }
}

/// Resolves the device set for one scrape cycle.
pub struct DeviceResolver<'a> {
    srv: &'a dyn SrvResolver,
    connector: &'a Connector,
}

impl<'a> DeviceResolver<'a> {
    pub fn new(srv: &'a dyn SrvResolver, connector: &'a Connector) -> Self {
        Self { srv, connector }
    }

    /// Expand `devices` into the concrete list to scrape.
    ///
    /// Static devices pass through unchanged. A failed SRV query drops only
    /// that template entry; the rest of the list is still returned.
    pub async fn resolve(&self, devices: &[Device]) -> Vec<Device> {
        let mut resolved = Vec::with_capacity(devices.len());
        for device in devices {
            match &device.srv {
                None => resolved.push(device.clone()),
                Some(_) => match self.expand(device).await {
                    Ok(found) => resolved.extend(found),
                    Err(e) => {
                        error!(device = %device.name, error = %e, "SRV discovery failed, skipping entry");
                    }
                },
            }
        }
        resolved
    }

    /// Turn one SRV template into one device per answer.
    pub async fn expand(&self, template: &Device) -> Result<Vec<Device>> {
        let Some(srv) = &template.srv else {
            return Ok(vec![template.clone()]);
        };
        info!(srv = %srv.record, "SRV configuration detected");

        let targets = self.srv.lookup_srv(&srv.record, srv.dns.as_ref()).await?;
        debug!(srv = %srv.record, answers = targets.len(), "SRV lookup done");

        let devices = targets.into_iter().map(|answer| {
            let host = answer.target.trim_end_matches('.').to_string();
            let port = template
                .port
                .or(Some(answer.port))
                .filter(|port| *port != 0);
            Device {
                name: host.clone(),
                address: host,
                srv: None,
                user: template.user.clone(),
                password: template.password.clone(),
                port,
            }
        });

        Ok(join_all(devices.map(|device| self.with_identity(device))).await)
    }

    /// Replace the device's name with the identity it reports.
    ///
    /// If the identity query fails the SRV-derived name is kept; the device
    /// is still scraped and an unreachable one reports `success=0` there.
    async fn with_identity(&self, mut device: Device) -> Device {
        match self.identity(&device).await {
            Ok(Some(identity)) => device.name = identity,
            Ok(None) => {}
            Err(e) => {
                warn!(device = %device.name, error = %e, "identity lookup failed, keeping SRV name");
            }
        }
        device
    }

    async fn identity(&self, device: &Device) -> Result<Option<String>> {
        let mut session = self.connector.connect(device).await?;
        let reply = session.run(&["/system/identity/print"]).await;
        if let Err(e) = session.close().await {
            debug!(device = %device.name, error = %e, "error closing identity session");
        }

        Ok(reply?
            .re
            .iter()
            .filter_map(|re| re.get("name"))
            .filter(|name| !name.is_empty())
            .last()
            .map(str::to_string))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SrvRecord;
    use crate::routeros::TransportOptions;

    struct FixedSrv(Result<Vec<SrvTarget>>);

    #[async_trait]
    impl SrvResolver for FixedSrv {
        async fn lookup_srv(&self, record: &str, _dns: Option<&DnsServer>) -> Result<Vec<SrvTarget>> {
            match &self.0 {
                Ok(targets) => Ok(targets.clone()),
                Err(e) => Err(ExporterError::discovery_error(record, e)),
            }
        }
    }

    fn fast_connector() -> Connector {
        Connector::new(TransportOptions {
            timeout: Duration::from_millis(200),
            ..Default::default()
        })
        .unwrap()
    }

    async fn closed_port() -> u16 {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    }

    #[tokio::test]
    async fn test_static_devices_pass_through() {
        let srv = FixedSrv(Ok(vec![]));
        let connector = fast_connector();
        let devices = vec![
            Device {
                name: "r1".into(),
                address: "10.0.0.1".into(),
                user: "u".into(),
                password: "p".into(),
                port: Some(8728),
                srv: None,
            },
            Device {
                name: "r2".into(),
                address: "10.0.0.2".into(),
                user: "u".into(),
                password: "p".into(),
                ..Default::default()
            },
        ];

        let resolved = DeviceResolver::new(&srv, &connector).resolve(&devices).await;
        assert_eq!(resolved, devices);
    }

    #[tokio::test]
    async fn test_srv_answers_become_devices() {
        let port = closed_port().await;
        let srv = FixedSrv(Ok(vec![
            SrvTarget {
                target: "127.0.0.1.".into(),
                port,
            },
            SrvTarget {
                target: "localhost.".into(),
                port,
            },
        ]));
        let connector = fast_connector();
        let template = Device {
            name: "fleet".into(),
            srv: Some(SrvRecord {
                record: "_api._tcp.example.com".into(),
                dns: None,
            }),
            user: "monitor".into(),
            password: "secret".into(),
            ..Default::default()
        };

        let resolved = DeviceResolver::new(&srv, &connector)
            .resolve(&[template])
            .await;

        // identity lookups fail against a closed port, so SRV names stay
        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved[0].name, "127.0.0.1");
        assert_eq!(resolved[0].address, "127.0.0.1");
        assert_eq!(resolved[1].name, "localhost");
        assert_eq!(resolved[1].port, Some(port));
        assert!(resolved.iter().all(|d| d.user == "monitor" && d.srv.is_none()));
    }

    #[tokio::test]
    async fn test_failed_srv_query_skips_only_that_entry() {
        let srv = FixedSrv(Err(ExporterError::protocol_error("SERVFAIL")));
        let connector = fast_connector();
        let devices = vec![
            Device {
                name: "fleet".into(),
                srv: Some(SrvRecord {
                    record: "_api._tcp.example.com".into(),
                    dns: None,
                }),
                user: "u".into(),
                password: "p".into(),
                ..Default::default()
            },
            Device {
                name: "r1".into(),
                address: "10.0.0.1".into(),
                user: "u".into(),
                password: "p".into(),
                ..Default::default()
            },
        ];

        let resolver = DeviceResolver::new(&srv, &connector);
        let err = resolver.expand(&devices[0]).await.unwrap_err();
        assert!(matches!(err, ExporterError::Discovery { .. }));

        let resolved = resolver.resolve(&devices).await;
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].name, "r1");
    }
}
