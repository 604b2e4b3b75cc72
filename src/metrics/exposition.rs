//! Rendering collected samples in the Prometheus text format.

use crate::error::{ExporterError, Result};
use crate::metrics::data::{Descriptor, MetricKind, Sample};
use prometheus::{CounterVec, Encoder, GaugeVec, Opts, Registry, TextEncoder};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::warn;

/// Content type of the rendered exposition.
pub const CONTENT_TYPE: &str = prometheus::TEXT_FORMAT;

enum Family {
    Gauge(GaugeVec),
    Counter(CounterVec),
}

/// Renders one scrape's samples against the descriptors declared at startup.
pub struct Exposition {
    descriptors: Vec<Arc<Descriptor>>,
}

impl Exposition {
    pub fn new(descriptors: Vec<Arc<Descriptor>>) -> Self {
        Self { descriptors }
    }

    /// Encode `samples` as text. A fresh registry is used per scrape so
    /// series that disappeared from a device don't linger.
    pub fn render(&self, samples: &[Sample]) -> Result<String> {
        let registry = Registry::new();
        let mut families: HashMap<&str, Family> = HashMap::new();

        for desc in &self.descriptors {
            let opts = Opts::new(desc.name.clone(), desc.help.clone());
            let labels: Vec<&str> = desc.label_names.iter().map(String::as_str).collect();
            let family = match desc.kind {
                MetricKind::Gauge => GaugeVec::new(opts, &labels).map(Family::Gauge),
                MetricKind::Counter => CounterVec::new(opts, &labels).map(Family::Counter),
            }
            .map_err(|e| ExporterError::metric_error(format!("{}: {}", desc.name, e)))?;

            let collector: Box<dyn prometheus::core::Collector> = match &family {
                Family::Gauge(vec) => Box::new(vec.clone()),
                Family::Counter(vec) => Box::new(vec.clone()),
            };
            registry
                .register(collector)
                .map_err(|e| ExporterError::metric_error(format!("{}: {}", desc.name, e)))?;
            families.insert(desc.name.as_str(), family);
        }

        let mut seen: HashSet<(&str, &[String])> = HashSet::with_capacity(samples.len());
        for sample in samples {
            let Some(family) = families.get(sample.desc.name.as_str()) else {
                warn!(metric = %sample.desc.name, "sample for undeclared metric dropped");
                continue;
            };
            // two devices sharing a name would otherwise be summed or overwritten
            if !seen.insert((sample.desc.name.as_str(), sample.label_values.as_slice())) {
                warn!(
                    metric = %sample.desc.name,
                    labels = ?sample.label_values,
                    "duplicate series dropped"
                );
                continue;
            }
            let values: Vec<&str> = sample.label_values.iter().map(String::as_str).collect();
            let applied = match family {
                Family::Gauge(vec) => vec.get_metric_with_label_values(&values).map(|g| g.set(sample.value)),
                Family::Counter(vec) if sample.value >= 0.0 => vec
                    .get_metric_with_label_values(&values)
                    .map(|c| c.inc_by(sample.value)),
                Family::Counter(_) => {
                    warn!(metric = %sample.desc.name, value = sample.value, "negative counter value dropped");
                    continue;
                }
            };
            if let Err(e) = applied {
                warn!(metric = %sample.desc.name, error = %e, "sample rejected");
            }
        }

        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&registry.gather(), &mut buffer)
            .map_err(|e| ExporterError::metric_error(e.to_string()))?;
        String::from_utf8(buffer).map_err(|e| ExporterError::metric_error(e.to_string()))
    }
}

/// `<namespace>_exporter_build_info{version}`, always 1.
pub fn build_info() -> (Arc<Descriptor>, Sample) {
    let desc = Descriptor::gauge(
        "exporter",
        "build_info",
        "version of the running exporter",
        &["version"],
    );
    let sample = Sample {
        desc: Arc::clone(&desc),
        value: 1.0,
        label_values: vec![env!("CARGO_PKG_VERSION").to_string()],
    };
    (desc, sample)
}
