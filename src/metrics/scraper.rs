//! Scrape orchestration: resolve devices, fan out one task per device, run
//! the collector pipeline against each, and report per-device outcomes.

use crate::config::Device;
use crate::discovery::{DeviceResolver, DnsSrvResolver, SrvResolver};
use crate::error::{ExporterError, Result};
use crate::metrics::collectors::Options;
use crate::metrics::data::{Descriptor, Sample, ScrapeOutcome};
use crate::metrics::sink::MetricSink;
use crate::metrics::traits::{Collector, CollectorContext};
use crate::routeros::{Connector, TransportOptions};
use futures_util::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

lazy_static::lazy_static! {
    static ref SCRAPE_DURATION: Arc<Descriptor> = Descriptor::gauge(
        "scrape",
        "collector_duration_seconds",
        "mikrotik_exporter: duration of a collector scrape",
        &["device"],
    );
    static ref SCRAPE_SUCCESS: Arc<Descriptor> = Descriptor::gauge(
        "scrape",
        "collector_success",
        "mikrotik_exporter: whether a collector succeeded",
        &["device"],
    );
}

/// Runs scrape cycles over a fixed device list and collector pipeline.
///
/// Cloning is cheap; all clones share the same configuration.
#[derive(Clone)]
pub struct Scraper {
    inner: Arc<Inner>,
}

struct Inner {
    devices: Vec<Device>,
    collectors: Vec<Arc<dyn Collector>>,
    connector: Connector,
    srv: Arc<dyn SrvResolver>,
}

/// Assembles a [`Scraper`].
pub struct ScraperBuilder {
    devices: Vec<Device>,
    transport: TransportOptions,
    collectors: Vec<Arc<dyn Collector>>,
    srv: Option<Arc<dyn SrvResolver>>,
}

impl ScraperBuilder {
    pub fn new(devices: Vec<Device>) -> Self {
        Self {
            devices,
            transport: TransportOptions::default(),
            collectors: Vec::new(),
            srv: None,
        }
    }

    pub fn with_transport(mut self, transport: TransportOptions) -> Self {
        self.transport = transport;
        self
    }

    /// Append the pipeline selected by `options`.
    pub fn with_options(mut self, options: Options) -> Self {
        self.collectors.extend(options.build());
        self
    }

    /// Append one collector to the pipeline.
    pub fn with_collector(mut self, collector: Arc<dyn Collector>) -> Self {
        self.collectors.push(collector);
        self
    }

    /// Use a custom SRV resolver instead of DNS.
    pub fn with_srv_resolver(mut self, srv: Arc<dyn SrvResolver>) -> Self {
        self.srv = Some(srv);
        self
    }

    pub fn build(self) -> Result<Scraper> {
        let connector = Connector::new(self.transport)?;
        let srv = self
            .srv
            .unwrap_or_else(|| Arc::new(DnsSrvResolver::new(self.transport.timeout)));

        info!(
            num_devices = self.devices.len(),
            num_collectors = self.collectors.len(),
            "setting up collector for devices"
        );

        Ok(Scraper {
            inner: Arc::new(Inner {
                devices: self.devices,
                collectors: self.collectors,
                connector,
                srv,
            }),
        })
    }
}

impl Scraper {
    pub fn builder(devices: Vec<Device>) -> ScraperBuilder {
        ScraperBuilder::new(devices)
    }

    /// Every descriptor a scrape may emit, scrape metadata first.
    pub fn describe(&self) -> Vec<Arc<Descriptor>> {
        let mut descs = vec![SCRAPE_DURATION.clone(), SCRAPE_SUCCESS.clone()];
        for collector in &self.inner.collectors {
            descs.extend(collector.describe());
        }
        descs
    }

    /// Run one scrape cycle, writing every sample into `sink`.
    ///
    /// Returns once every device's work has finished. Per-device failures
    /// are logged and reported as `success=0`; they never fail the cycle.
    pub async fn scrape(&self, sink: &MetricSink) -> Vec<ScrapeOutcome> {
        let resolver = DeviceResolver::new(self.inner.srv.as_ref(), &self.inner.connector);
        let devices = resolver.resolve(&self.inner.devices).await;

        let mut tasks = JoinSet::new();
        for device in devices {
            let inner = Arc::clone(&self.inner);
            let sink = sink.clone();
            tasks.spawn(async move { inner.scrape_device(device, &sink).await });
        }

        let mut outcomes = Vec::with_capacity(tasks.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => error!(error = %e, "device scrape task aborted"),
            }
        }
        outcomes
    }
}

impl Inner {
    async fn scrape_device(&self, device: Device, sink: &MetricSink) -> ScrapeOutcome {
        let begin = Instant::now();
        let result = AssertUnwindSafe(self.connect_and_collect(&device, sink))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| {
                Err(ExporterError::collect_error("scrape", panic_message(&*panic)))
            });
        let duration = begin.elapsed();

        let success = match result {
            Ok(()) => {
                debug!(device = %device.name, seconds = duration.as_secs_f64(), "collector succeeded");
                true
            }
            Err(e) => {
                error!(
                    device = %device.name,
                    seconds = duration.as_secs_f64(),
                    error = %e,
                    "collector failed"
                );
                false
            }
        };

        let outcome = ScrapeOutcome {
            device: device.name,
            duration,
            success,
        };
        for sample in outcome_samples(&outcome) {
            sink.emit(sample);
        }
        outcome
    }

    async fn connect_and_collect(&self, device: &Device, sink: &MetricSink) -> Result<()> {
        let mut session = self.connector.connect(device).await?;

        let mut result = Ok(());
        {
            let mut ctx = CollectorContext::new(&mut session, device, sink);
            for collector in &self.collectors {
                debug!(device = %device.name, collector = collector.name(), "collecting");
                if let Err(e) = collector.collect(&mut ctx).await {
                    result = Err(e);
                    break;
                }
            }
        }

        if let Err(e) = session.close().await {
            debug!(device = %device.name, error = %e, "error closing session");
        }
        result
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    let reason = panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown cause".to_string());
    format!("panicked: {}", reason)
}

/// The duration and success samples for one device.
pub fn outcome_samples(outcome: &ScrapeOutcome) -> Vec<Sample> {
    let labels = || vec![outcome.device.clone()];
    let success = if outcome.success { 1.0 } else { 0.0 };
    // label arity matches the static descriptors above
    [
        Sample::new(&SCRAPE_DURATION, outcome.duration.as_secs_f64(), labels()),
        Sample::new(&SCRAPE_SUCCESS, success, labels()),
    ]
    .into_iter()
    .flatten()
    .collect()
}
