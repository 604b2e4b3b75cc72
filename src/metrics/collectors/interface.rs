use crate::error::Result;
use crate::metrics::collectors::{numeric, proplist, query};
use crate::metrics::data::Descriptor;
use crate::metrics::traits::{Collector, CollectorContext};
use crate::routeros::Sentence;
use async_trait::async_trait;
use std::sync::Arc;

const NAME: &str = "interface";
const PROPS: [&str; 12] = [
    "name", "type", "disabled", "comment", "rx-byte", "tx-byte", "rx-packet", "tx-packet",
    "rx-error", "tx-error", "rx-drop", "tx-drop",
];
// the first four props become labels
const LABEL_PROPS: usize = 4;

/// Per-interface traffic counters from `/interface/print`.
pub struct InterfaceCollector {
    metrics: Vec<(&'static str, Arc<Descriptor>)>,
}

impl InterfaceCollector {
    pub fn new() -> Self {
        let labels = ["device", "interface", "type", "disabled", "comment"];
        let metrics = PROPS[LABEL_PROPS..]
            .iter()
            .map(|prop| {
                let help = format!("number of {} on the interface", prop.replace('-', " "));
                (*prop, Descriptor::counter(NAME, prop, &help, &labels))
            })
            .collect();
        Self { metrics }
    }

    fn collect_record(&self, ctx: &CollectorContext<'_>, re: &Sentence) -> Result<()> {
        let labels = [
            re.get("name").unwrap_or_default(),
            re.get("type").unwrap_or_default(),
            re.get("disabled").unwrap_or_default(),
            re.get("comment").unwrap_or_default(),
        ];
        for (prop, desc) in &self.metrics {
            if let Some(value) = numeric(ctx, re, prop) {
                ctx.emit(desc, value, &labels)?;
            }
        }
        Ok(())
    }
}

impl Default for InterfaceCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Collector for InterfaceCollector {
    fn name(&self) -> &'static str {
        NAME
    }

    fn describe(&self) -> Vec<Arc<Descriptor>> {
        self.metrics.iter().map(|(_, d)| d.clone()).collect()
    }

    async fn collect(&self, ctx: &mut CollectorContext<'_>) -> Result<()> {
        let records = query(ctx, NAME, &["/interface/print".to_string(), proplist(&PROPS)]).await?;
        for re in &records {
            self.collect_record(ctx, re)?;
        }
        Ok(())
    }
}
