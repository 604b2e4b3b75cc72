//! Metric descriptors, samples and per-device scrape outcomes.

use crate::error::{ExporterError, Result};
use std::sync::Arc;
use std::time::Duration;

/// How a metric's values behave between scrapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Gauge,
    Counter,
}

/// The fixed name and label schema of one metric.
///
/// Descriptors are built once at startup and shared read-only; every
/// sample referencing one carries exactly as many label values as the
/// descriptor has label names, in the same order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    /// Fully qualified metric name, e.g. `mikrotik_interface_rx_byte`
    pub name: String,
    /// Help text
    pub help: String,
    /// Ordered label names; the first is always `device`
    pub label_names: Vec<String>,
    pub kind: MetricKind,
}

impl Descriptor {
    /// A gauge named `<namespace>_<subsystem>_<name>`.
    pub fn gauge(subsystem: &str, name: &str, help: &str, labels: &[&str]) -> Arc<Self> {
        Self::build(subsystem, name, help, labels, MetricKind::Gauge)
    }

    /// A counter named `<namespace>_<subsystem>_<name>`.
    pub fn counter(subsystem: &str, name: &str, help: &str, labels: &[&str]) -> Arc<Self> {
        Self::build(subsystem, name, help, labels, MetricKind::Counter)
    }

    fn build(
        subsystem: &str,
        name: &str,
        help: &str,
        labels: &[&str],
        kind: MetricKind,
    ) -> Arc<Self> {
        Arc::new(Self {
            name: fq_name(crate::NAMESPACE, subsystem, name),
            help: help.to_string(),
            label_names: labels.iter().map(|l| l.to_string()).collect(),
            kind,
        })
    }
}

/// Join non-empty name parts with `_`; dashes become underscores.
pub fn fq_name(namespace: &str, subsystem: &str, name: &str) -> String {
    [namespace, subsystem, name]
        .iter()
        .filter(|part| !part.is_empty())
        .map(|part| part.replace('-', "_"))
        .collect::<Vec<_>>()
        .join("_")
}

/// One observation emitted during a scrape.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub desc: Arc<Descriptor>,
    pub value: f64,
    pub label_values: Vec<String>,
}

impl Sample {
    /// Create a sample, rejecting label values that don't match the
    /// descriptor's label names.
    pub fn new(desc: &Arc<Descriptor>, value: f64, label_values: Vec<String>) -> Result<Self> {
        if label_values.len() != desc.label_names.len() {
            return Err(ExporterError::metric_error(format!(
                "{}: expected {} label values, got {}",
                desc.name,
                desc.label_names.len(),
                label_values.len()
            )));
        }
        Ok(Self {
            desc: Arc::clone(desc),
            value,
            label_values,
        })
    }

    /// Value of the named label, if the descriptor has it.
    pub fn label(&self, name: &str) -> Option<&str> {
        self.desc
            .label_names
            .iter()
            .position(|n| n == name)
            .map(|i| self.label_values[i].as_str())
    }
}

/// How one device fared in one scrape cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrapeOutcome {
    pub device: String,
    pub duration: Duration,
    pub success: bool,
}
