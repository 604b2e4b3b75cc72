use crate::error::Result;
use crate::metrics::collectors::{parse_value, proplist, query};
use crate::metrics::data::Descriptor;
use crate::metrics::traits::{Collector, CollectorContext};
use crate::routeros::Sentence;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

const NAME: &str = "wlan_stations";
const PROPS: [&str; 7] = [
    "interface",
    "mac-address",
    "signal-to-noise",
    "signal-strength",
    "packets",
    "bytes",
    "frames",
];
// props reported as "tx,rx" pairs
const PAIR_PROPS: [&str; 3] = ["packets", "bytes", "frames"];

/// Associated wireless clients from the registration table.
pub struct WlanStationCollector {
    signal: Vec<(&'static str, Arc<Descriptor>)>,
    pairs: Vec<(&'static str, Arc<Descriptor>, Arc<Descriptor>)>,
}

impl WlanStationCollector {
    pub fn new() -> Self {
        let labels = ["device", "interface", "mac_address"];
        let signal = ["signal-to-noise", "signal-strength"]
            .iter()
            .map(|prop| {
                let help = format!("{} of the wireless station", prop.replace('-', " "));
                (*prop, Descriptor::gauge("wlan_station", prop, &help, &labels))
            })
            .collect();
        let pairs = PAIR_PROPS
            .iter()
            .map(|prop| {
                let tx = Descriptor::counter(
                    "wlan_station",
                    &format!("tx_{}", prop),
                    &format!("{} sent to the wireless station", prop),
                    &labels,
                );
                let rx = Descriptor::counter(
                    "wlan_station",
                    &format!("rx_{}", prop),
                    &format!("{} received from the wireless station", prop),
                    &labels,
                );
                (*prop, tx, rx)
            })
            .collect();
        Self { signal, pairs }
    }

    fn collect_record(&self, ctx: &CollectorContext<'_>, re: &Sentence) -> Result<()> {
        let labels = [
            re.get("interface").unwrap_or_default(),
            re.get("mac-address").unwrap_or_default(),
        ];

        for (prop, desc) in &self.signal {
            // signal-strength reads like "-65@HT20-7"
            let raw = re.get(prop).unwrap_or_default();
            let raw = raw.split('@').next().unwrap_or_default();
            if let Some(value) = self.parse(ctx, prop, raw) {
                ctx.emit(desc, value, &labels)?;
            }
        }

        for (prop, tx, rx) in &self.pairs {
            let raw = re.get(prop).unwrap_or_default();
            let Some((tx_raw, rx_raw)) = raw.split_once(',') else {
                continue;
            };
            if let Some(value) = self.parse(ctx, prop, tx_raw) {
                ctx.emit(tx, value, &labels)?;
            }
            if let Some(value) = self.parse(ctx, prop, rx_raw) {
                ctx.emit(rx, value, &labels)?;
            }
        }
        Ok(())
    }

    fn parse(&self, ctx: &CollectorContext<'_>, prop: &str, raw: &str) -> Option<f64> {
        match parse_value(raw)? {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(
                    device = %ctx.device.name,
                    property = prop,
                    value = raw,
                    error = %e,
                    "error parsing wireless station value"
                );
                None
            }
        }
    }
}

impl Default for WlanStationCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Collector for WlanStationCollector {
    fn name(&self) -> &'static str {
        NAME
    }

    fn describe(&self) -> Vec<Arc<Descriptor>> {
        let mut descs: Vec<_> = self.signal.iter().map(|(_, d)| d.clone()).collect();
        for (_, tx, rx) in &self.pairs {
            descs.push(tx.clone());
            descs.push(rx.clone());
        }
        descs
    }

    async fn collect(&self, ctx: &mut CollectorContext<'_>) -> Result<()> {
        let records = query(
            ctx,
            NAME,
            &[
                "/interface/wireless/registration-table/print".to_string(),
                proplist(&PROPS),
            ],
        )
        .await?;
        for re in &records {
            self.collect_record(ctx, re)?;
        }
        Ok(())
    }
}
