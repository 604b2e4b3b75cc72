use crate::error::Result;
use crate::metrics::collectors::{parse_duration, proplist, query};
use crate::metrics::data::Descriptor;
use crate::metrics::traits::{Collector, CollectorContext};
use async_trait::async_trait;
use std::sync::Arc;

const NAME: &str = "dhcp_leases";
const PROPS: [&str; 6] = [
    "active-mac-address",
    "server",
    "status",
    "expires-after",
    "active-address",
    "host-name",
];

/// Bound DHCP leases, one sample per lease valued by its remaining lifetime.
pub struct DhcpLeaseCollector {
    lease: Arc<Descriptor>,
}

impl DhcpLeaseCollector {
    pub fn new() -> Self {
        Self {
            lease: Descriptor::gauge(
                "dhcpl",
                "leases_metrics",
                "seconds until a bound DHCP lease expires",
                &[
                    "device",
                    "activemacaddress",
                    "server",
                    "status",
                    "activeaddress",
                    "hostname",
                ],
            ),
        }
    }
}

impl Default for DhcpLeaseCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Collector for DhcpLeaseCollector {
    fn name(&self) -> &'static str {
        NAME
    }

    fn describe(&self) -> Vec<Arc<Descriptor>> {
        vec![self.lease.clone()]
    }

    async fn collect(&self, ctx: &mut CollectorContext<'_>) -> Result<()> {
        let records = query(
            ctx,
            NAME,
            &[
                "/ip/dhcp-server/lease/print".to_string(),
                "?status=bound".to_string(),
                proplist(&PROPS),
            ],
        )
        .await?;

        for re in &records {
            // static leases have no expiry
            let expires = re.get("expires-after").and_then(parse_duration).unwrap_or(0.0);
            ctx.emit(
                &self.lease,
                expires,
                &[
                    re.get("active-mac-address").unwrap_or_default(),
                    re.get("server").unwrap_or_default(),
                    re.get("status").unwrap_or_default(),
                    re.get("active-address").unwrap_or_default(),
                    re.get("host-name").unwrap_or_default(),
                ],
            )?;
        }
        Ok(())
    }
}
