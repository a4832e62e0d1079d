//! Fulfillment process: wires the saga participants and the analytics
//! consumer onto one in-process event bus, and serves a small HTTP read
//! surface with structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use analytics::{AnalyticsAggregator, spawn_reporter};
use axum::Router;
use axum::routing::get;
use event_bus::{InMemoryEventBus, SubscriptionHandle};
use metrics_exporter_prometheus::PrometheusHandle;
use saga::{FastRandom, OrderGenerator, Publisher, Randomness, SagaPipeline};
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;
use error::StartupError;

/// Shared state for the HTTP handlers.
pub struct AppState {
    pub bus: InMemoryEventBus,
    pub analytics: AnalyticsAggregator,
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_state = Arc::new(routes::metrics::MetricsState {
        handle: metrics_handle,
        bus: state.bus.clone(),
    });
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_state);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/analytics", get(routes::analytics::snapshot))
        .route("/orders/{id}", get(routes::orders::status))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Everything running in the background of the process.
pub struct Fulfillment {
    state: Arc<AppState>,
    pipeline: SagaPipeline,
    analytics: SubscriptionHandle,
    tasks: Vec<JoinHandle<()>>,
}

impl Fulfillment {
    /// Builds the bus and starts analytics, the saga pipeline, the periodic
    /// reporter and, if enabled, the demo order generator.
    pub async fn start(config: &Config) -> Result<Self, StartupError> {
        Self::start_with(config, Arc::new(FastRandom::new())).await
    }

    /// Like [`Fulfillment::start`] with a caller-supplied randomness source.
    pub async fn start_with(
        config: &Config,
        rng: Arc<dyn Randomness>,
    ) -> Result<Self, StartupError> {
        let bus = InMemoryEventBus::with_config(config.bus_config())?;

        // analytics subscribes first so it sees the very first order
        let aggregator = AnalyticsAggregator::new(config.report_every);
        let analytics = aggregator.subscribe(&bus).await?;

        let pipeline =
            SagaPipeline::start(&bus, Arc::clone(&rng), config.pipeline_options()).await?;

        let mut tasks = Vec::new();
        if let Some(period) = config.report_interval() {
            tasks.push(spawn_reporter(aggregator.clone(), period));
        }
        if let Some(period) = config.order_interval() {
            let publisher = Publisher::new(bus.clone(), config.partition_key());
            tasks.push(OrderGenerator::new(rng).spawn(publisher, period));
            tracing::info!(?period, "order generator started");
        }

        let state = Arc::new(AppState {
            bus,
            analytics: aggregator,
        });

        Ok(Self {
            state,
            pipeline,
            analytics,
            tasks,
        })
    }

    pub fn state(&self) -> Arc<AppState> {
        Arc::clone(&self.state)
    }

    /// Stops background tasks first, then the consumers, and closes the bus.
    pub async fn shutdown(self) {
        for task in &self.tasks {
            task.abort();
        }
        self.pipeline.shutdown().await;
        self.analytics.shutdown().await;
        self.state.bus.close();
        log_final_report(&self.state).await;
    }
}

async fn log_final_report(state: &AppState) {
    analytics::log_report(&state.analytics.snapshot().await);
}
