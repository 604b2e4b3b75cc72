//! The shared output channel every device's work writes samples into.

use crate::metrics::data::Sample;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::StreamExt;
use tracing::warn;

/// Cloneable writer half. Each in-flight device holds a clone; the reader
/// sees end-of-stream only once every clone has been dropped.
#[derive(Debug, Clone)]
pub struct MetricSink {
    tx: mpsc::UnboundedSender<Sample>,
}

/// Reader half, drained by the exposition layer after a cycle joins.
#[derive(Debug)]
pub struct SampleStream {
    rx: UnboundedReceiverStream<Sample>,
}

impl MetricSink {
    /// Create a connected writer/reader pair.
    pub fn channel() -> (MetricSink, SampleStream) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            MetricSink { tx },
            SampleStream {
                rx: UnboundedReceiverStream::new(rx),
            },
        )
    }

    /// Append one sample. Samples are moved whole, so concurrent writers
    /// never interleave fields.
    pub fn emit(&self, sample: Sample) {
        if let Err(e) = self.tx.send(sample) {
            warn!(metric = %e.0.desc.name, "sample dropped, reader is gone");
        }
    }
}

impl SampleStream {
    /// Read every sample until all writers are gone.
    pub async fn collect(self) -> Vec<Sample> {
        self.rx.collect().await
    }

    pub fn into_inner(self) -> UnboundedReceiverStream<Sample> {
        self.rx
    }
}
