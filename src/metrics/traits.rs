//! The collector plugin interface.

use crate::config::Device;
use crate::error::Result;
use crate::metrics::data::{Descriptor, Sample};
use crate::metrics::sink::MetricSink;
use crate::routeros::Session;
use async_trait::async_trait;
use std::sync::Arc;

/// Everything a collector needs while scraping one device.
pub struct CollectorContext<'a> {
    /// The device's session, exclusively borrowed for this scrape
    pub session: &'a mut Session,
    /// The resolved device; its name is the `device` label
    pub device: &'a Device,
    pub sink: &'a MetricSink,
}

impl<'a> CollectorContext<'a> {
    pub fn new(session: &'a mut Session, device: &'a Device, sink: &'a MetricSink) -> Self {
        Self {
            session,
            device,
            sink,
        }
    }

    /// Emit a sample labelled with the device name followed by `labels`.
    pub fn emit(&self, desc: &Arc<Descriptor>, value: f64, labels: &[&str]) -> Result<()> {
        let mut values = Vec::with_capacity(labels.len() + 1);
        values.push(self.device.name.clone());
        values.extend(labels.iter().map(|l| l.to_string()));
        self.sink.emit(Sample::new(desc, value, values)?);
        Ok(())
    }
}

/// One category of device telemetry.
///
/// `describe` is called once at startup, independent of any device.
/// `collect` is called once per device per scrape cycle; an error stops the
/// remaining collectors for that device and marks its scrape as failed.
#[async_trait]
pub trait Collector: Send + Sync {
    /// Short name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Every descriptor this collector can emit samples for.
    fn describe(&self) -> Vec<Arc<Descriptor>>;

    /// Query the device and emit samples into the context's sink.
    async fn collect(&self, ctx: &mut CollectorContext<'_>) -> Result<()>;
}
