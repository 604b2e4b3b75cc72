//! HTTP handlers.

use crate::metrics::exposition::{self, Exposition, CONTENT_TYPE};
use crate::metrics::{MetricSink, Scraper};
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
};
use std::sync::Arc;
use tracing::{debug, error};

/// Shared state of the web server.
#[derive(Clone)]
pub struct AppState {
    pub scraper: Scraper,
    pub exposition: Arc<Exposition>,
    pub metrics_path: String,
}

impl AppState {
    /// Declare every descriptor once, up front.
    pub fn new(scraper: Scraper, metrics_path: impl Into<String>) -> Self {
        let mut descriptors = scraper.describe();
        descriptors.push(exposition::build_info().0);
        Self {
            scraper,
            exposition: Arc::new(Exposition::new(descriptors)),
            metrics_path: metrics_path.into(),
        }
    }
}

/// Run one scrape cycle and render it.
pub async fn metrics(State(state): State<AppState>) -> Response {
    let (sink, stream) = MetricSink::channel();
    let outcomes = state.scraper.scrape(&sink).await;
    // every device task has joined; closing the last writer ends the stream
    drop(sink);

    let mut samples = stream.collect().await;
    samples.push(exposition::build_info().1);
    debug!(
        devices = outcomes.len(),
        failed = outcomes.iter().filter(|o| !o.success).count(),
        samples = samples.len(),
        "scrape cycle finished"
    );

    match state.exposition.render(&samples) {
        Ok(body) => ([(header::CONTENT_TYPE, CONTENT_TYPE)], body).into_response(),
        Err(e) => {
            error!(error = %e, "failed to render metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

/// Liveness check.
pub async fn health_check() -> &'static str {
    "ok"
}

/// Landing page linking to the metrics path.
pub async fn index(State(state): State<AppState>) -> Html<String> {
    Html(format!(
        "<html>\n<head><title>RouterOS Exporter</title></head>\n<body>\n\
         <h1>RouterOS Exporter</h1>\n<p><a href=\"{path}\">Metrics</a></p>\n\
         <p>Version {version}, started {started}</p>\n</body>\n</html>\n",
        path = state.metrics_path,
        version = env!("CARGO_PKG_VERSION"),
        started = *crate::STARTED_AT,
    ))
}
