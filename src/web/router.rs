//! Web application router and middleware setup.

use crate::web::handlers::{self, AppState};
use axum::{routing::get, Router};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

/// Create the axum application with all routes and middleware.
pub fn create_app(state: AppState) -> Router {
    let metrics_path = state.metrics_path.clone();

    Router::new()
        .route(&metrics_path, get(handlers::metrics))
        .route("/healthz", get(handlers::health_check))
        .route("/", get(handlers::index))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}
