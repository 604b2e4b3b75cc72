//! Device metrics: descriptors and samples, the shared sink, the collector
//! plugins, and the scrape orchestration that drives them.
//!
//! A scrape cycle resolves the device list, opens one session per device
//! concurrently, runs the ordered collector pipeline against it, and emits
//! a duration and success sample for every device.

pub mod collectors;
pub mod data;
pub mod exposition;
pub mod scraper;
pub mod sink;
pub mod traits;

// Re-export commonly used items
pub use collectors::Options;
pub use data::{Descriptor, MetricKind, Sample, ScrapeOutcome};
pub use exposition::Exposition;
pub use scraper::{Scraper, ScraperBuilder};
pub use sink::{MetricSink, SampleStream};
pub use traits::{Collector, CollectorContext};
