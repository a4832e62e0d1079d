//! Prometheus metrics endpoint.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use domain::Topic;
use event_bus::InMemoryEventBus;
use metrics_exporter_prometheus::PrometheusHandle;

/// State for the metrics route: the recorder handle plus the bus whose
/// topic logs are sampled on each scrape.
#[derive(Clone)]
pub struct MetricsState {
    pub handle: PrometheusHandle,
    pub bus: InMemoryEventBus,
}

/// GET /metrics: returns Prometheus-formatted metrics.
pub async fn get(State(state): State<Arc<MetricsState>>) -> impl IntoResponse {
    for topic in Topic::ALL {
        let count = state.bus.message_count(topic.as_str()).await;
        metrics::gauge!("bus_topic_messages", "topic" => topic.as_str()).set(count as f64);
    }

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        state.handle.render(),
    )
}
