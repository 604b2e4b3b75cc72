use crate::error::{ExporterError, Result};
use crate::metrics::collectors::{parse_value, proplist};
use crate::metrics::data::Descriptor;
use crate::metrics::traits::{Collector, CollectorContext};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::error;

const NAME: &str = "dhcp";

/// Active lease count per DHCP server.
pub struct DhcpCollector {
    leases: Arc<Descriptor>,
}

impl DhcpCollector {
    pub fn new() -> Self {
        Self {
            leases: Descriptor::gauge(
                NAME,
                "leases_active_count",
                "number of active leases per DHCP server",
                &["device", "server"],
            ),
        }
    }

    async fn count_leases(&self, ctx: &mut CollectorContext<'_>, server: &str) -> Result<f64> {
        let words = [
            "/ip/dhcp-server/lease/print".to_string(),
            "=count-only=".to_string(),
            format!("?server={}", server),
        ];
        let reply = ctx.session.run(&words).await.map_err(|e| {
            error!(device = %ctx.device.name, server, error = %e, "error fetching DHCP lease count");
            ExporterError::collect_error(NAME, e)
        })?;

        // count-only answers with the total in the `ret` attribute of `!done`
        let ret = reply
            .done
            .as_ref()
            .and_then(|done| done.get("ret"))
            .unwrap_or("0");
        match parse_value(ret) {
            None => Ok(0.0),
            Some(Ok(count)) => Ok(count),
            Some(Err(e)) => Err(ExporterError::collect_error(
                NAME,
                format!("invalid lease count {:?}: {}", ret, e),
            )),
        }
    }
}

impl Default for DhcpCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Collector for DhcpCollector {
    fn name(&self) -> &'static str {
        NAME
    }

    fn describe(&self) -> Vec<Arc<Descriptor>> {
        vec![self.leases.clone()]
    }

    async fn collect(&self, ctx: &mut CollectorContext<'_>) -> Result<()> {
        let servers = super::query(
            ctx,
            NAME,
            &["/ip/dhcp-server/print".to_string(), proplist(&["name"])],
        )
        .await?;

        for server in &servers {
            let name = server.get("name").unwrap_or_default();
            let count = self.count_leases(ctx, name).await?;
            ctx.emit(&self.leases, count, &[name])?;
        }
        Ok(())
    }
}
