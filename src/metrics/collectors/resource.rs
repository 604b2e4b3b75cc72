use crate::error::Result;
use crate::metrics::collectors::{numeric, parse_duration, proplist, query};
use crate::metrics::data::Descriptor;
use crate::metrics::traits::{Collector, CollectorContext};
use crate::routeros::Sentence;
use async_trait::async_trait;
use std::sync::Arc;

const NAME: &str = "resource";
const PROPS: [&str; 8] = [
    "free-memory",
    "total-memory",
    "cpu-load",
    "free-hdd-space",
    "total-hdd-space",
    "uptime",
    "board-name",
    "version",
];

/// System resource usage from `/system/resource/print`.
pub struct ResourceCollector {
    metrics: Vec<(&'static str, Arc<Descriptor>)>,
}

impl ResourceCollector {
    pub fn new() -> Self {
        let labels = ["device", "boardname", "version"];
        let metrics = PROPS[..6]
            .iter()
            .map(|prop| {
                let help = format!("{} of the system", prop.replace('-', " "));
                (*prop, Descriptor::gauge("system", prop, &help, &labels))
            })
            .collect();
        Self { metrics }
    }

    fn collect_record(&self, ctx: &CollectorContext<'_>, re: &Sentence) -> Result<()> {
        let labels = [
            re.get("board-name").unwrap_or_default(),
            re.get("version").unwrap_or_default(),
        ];
        for (prop, desc) in &self.metrics {
            let value = if *prop == "uptime" {
                re.get(prop).and_then(parse_duration)
            } else {
                numeric(ctx, re, prop)
            };
            if let Some(value) = value {
                ctx.emit(desc, value, &labels)?;
            }
        }
        Ok(())
    }
}

impl Default for ResourceCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Collector for ResourceCollector {
    fn name(&self) -> &'static str {
        NAME
    }

    fn describe(&self) -> Vec<Arc<Descriptor>> {
        self.metrics.iter().map(|(_, d)| d.clone()).collect()
    }

    async fn collect(&self, ctx: &mut CollectorContext<'_>) -> Result<()> {
        let records = query(
            ctx,
            NAME,
            &["/system/resource/print".to_string(), proplist(&PROPS)],
        )
        .await?;
        for re in &records {
            self.collect_record(ctx, re)?;
        }
        Ok(())
    }
}
