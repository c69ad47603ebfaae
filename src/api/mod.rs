pub mod handlers;

use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::metrics::MetricsSink;

pub fn create_router(metrics: Arc<dyn MetricsSink>) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/metrics", get(handlers::metrics))
        .route("/metrics.json", get(handlers::metrics_json))
        .layer(TraceLayer::new_for_http())
        .with_state(metrics)
}
