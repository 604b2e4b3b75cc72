use crate::error::Result;
use crate::metrics::collectors::{parse_value, proplist, query};
use crate::metrics::data::Descriptor;
use crate::metrics::traits::{Collector, CollectorContext};
use crate::routeros::Sentence;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

const NAME: &str = "bgp";
const PROPS: [&str; 8] = [
    "name",
    "remote-as",
    "state",
    "prefix-count",
    "updates-sent",
    "updates-received",
    "withdrawn-sent",
    "withdrawn-received",
];

/// BGP peer state from `/routing/bgp/peer/print`.
pub struct BgpCollector {
    up: Arc<Descriptor>,
    metrics: Vec<(&'static str, Arc<Descriptor>)>,
}

impl BgpCollector {
    pub fn new() -> Self {
        let labels = ["device", "session", "asn"];
        let up = Descriptor::gauge(NAME, "up", "BGP session is established (up = 1)", &labels);
        let metrics = PROPS[3..]
            .iter()
            .map(|prop| {
                let help = format!("number of BGP {}", prop.replace('-', " "));
                (*prop, Descriptor::gauge(NAME, prop, &help, &labels))
            })
            .collect();
        Self { up, metrics }
    }

    fn collect_record(&self, ctx: &CollectorContext<'_>, re: &Sentence) -> Result<()> {
        let labels = [
            re.get("name").unwrap_or_default(),
            re.get("remote-as").unwrap_or_default(),
        ];

        let up = if re.get("state") == Some("established") { 1.0 } else { 0.0 };
        ctx.emit(&self.up, up, &labels)?;

        for (prop, desc) in &self.metrics {
            // counters of a peer that never came up are empty
            let value = match re.get(prop).and_then(parse_value) {
                None => 0.0,
                Some(Ok(value)) => value,
                Some(Err(e)) => {
                    warn!(
                        device = %ctx.device.name,
                        property = *prop,
                        error = %e,
                        "error parsing bgp metric value"
                    );
                    continue;
                }
            };
            ctx.emit(desc, value, &labels)?;
        }
        Ok(())
    }
}

impl Default for BgpCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Collector for BgpCollector {
    fn name(&self) -> &'static str {
        NAME
    }

    fn describe(&self) -> Vec<Arc<Descriptor>> {
        std::iter::once(self.up.clone())
            .chain(self.metrics.iter().map(|(_, d)| d.clone()))
            .collect()
    }

    async fn collect(&self, ctx: &mut CollectorContext<'_>) -> Result<()> {
        let records = query(
            ctx,
            NAME,
            &["/routing/bgp/peer/print".to_string(), proplist(&PROPS)],
        )
        .await?;
        for re in &records {
            self.collect_record(ctx, re)?;
        }
        Ok(())
    }
}
