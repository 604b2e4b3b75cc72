//! HTTP surface: the scrape endpoint, a health check and a landing page.

pub mod config;
pub mod handlers;
pub mod router;

// Re-export commonly used items
pub use config::WebConfig;
pub use handlers::AppState;
pub use router::create_app;

use crate::error::{ExporterError, Result};
use crate::metrics::Scraper;
use std::net::SocketAddr;
use tracing::info;

/// Serve scrape requests until the process is stopped.
pub async fn start_web_server(config: WebConfig, scraper: Scraper) -> Result<()> {
    let app = create_app(AppState::new(scraper, config.metrics_path.clone()));

    // Parse the bind address
    let addr = config
        .bind_address()
        .parse::<SocketAddr>()
        .map_err(|e| ExporterError::config_error(format!("Invalid bind address: {}", e)))?;

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| ExporterError::web_server_error(format!("Failed to bind to address: {}", e)))?;

    info!("Listening on http://{}", addr);
    info!("Metrics available at http://{}{}", addr, config.metrics_path);

    axum::serve(listener, app)
        .await
        .map_err(|e| ExporterError::web_server_error(format!("Server error: {}", e)))?;

    Ok(())
}
