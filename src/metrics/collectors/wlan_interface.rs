use crate::error::Result;
use crate::metrics::collectors::{numeric, proplist, query};
use crate::metrics::data::Descriptor;
use crate::metrics::traits::{Collector, CollectorContext};
use async_trait::async_trait;
use std::sync::Arc;

const NAME: &str = "wlan_interfaces";
const MONITOR_PROPS: [&str; 4] = [
    "channel",
    "registered-clients",
    "noise-floor",
    "overall-tx-ccq",
];

/// Radio state of every enabled wireless interface.
///
/// The interface list comes from `/interface/wireless/print`; each radio is
/// then sampled once with `/interface/wireless/monitor`.
pub struct WlanInterfaceCollector {
    metrics: Vec<(&'static str, Arc<Descriptor>)>,
}

impl WlanInterfaceCollector {
    pub fn new() -> Self {
        let labels = ["device", "interface", "channel"];
        let metrics = MONITOR_PROPS[1..]
            .iter()
            .map(|prop| {
                let help = format!("{} of the wireless interface", prop.replace('-', " "));
                (*prop, Descriptor::gauge("wlan_interface", prop, &help, &labels))
            })
            .collect();
        Self { metrics }
    }
}

impl Default for WlanInterfaceCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Collector for WlanInterfaceCollector {
    fn name(&self) -> &'static str {
        NAME
    }

    fn describe(&self) -> Vec<Arc<Descriptor>> {
        self.metrics.iter().map(|(_, d)| d.clone()).collect()
    }

    async fn collect(&self, ctx: &mut CollectorContext<'_>) -> Result<()> {
        let interfaces = query(
            ctx,
            NAME,
            &[
                "/interface/wireless/print".to_string(),
                "?disabled=false".to_string(),
                proplist(&["name"]),
            ],
        )
        .await?;

        for iface in &interfaces {
            let name = iface.get("name").unwrap_or_default();
            let monitor = query(
                ctx,
                NAME,
                &[
                    "/interface/wireless/monitor".to_string(),
                    format!("=numbers={}", name),
                    "=once=".to_string(),
                    proplist(&MONITOR_PROPS),
                ],
            )
            .await?;

            for re in &monitor {
                let channel = re.get("channel").unwrap_or_default();
                for (prop, desc) in &self.metrics {
                    if let Some(value) = numeric(ctx, re, prop) {
                        ctx.emit(desc, value, &[name, channel])?;
                    }
                }
            }
        }
        Ok(())
    }
}
