//! Bus consumer feeding [`AnalyticsState`].

use std::sync::Arc;

use async_trait::async_trait;
use domain::{SagaEvent, Topic};
use event_bus::{EventBus, Message, MessageHandler, SubscriptionHandle};
use tokio::sync::RwLock;

use crate::{AnalyticsSnapshot, AnalyticsState, Result, log_report};

pub const CONSUMER_GROUP: &str = "analytics-group";
pub const DEFAULT_REPORT_EVERY: u64 = 20;

/// Consumes every topic and keeps the analytics counters current.
///
/// The state has a single owner; concurrent partition tasks take the write
/// lock for each update. Cloning yields another handle to the same state.
#[derive(Clone)]
pub struct AnalyticsAggregator {
    state: Arc<RwLock<AnalyticsState>>,
    report_every: u64,
}

impl AnalyticsAggregator {
    /// `report_every` of zero disables threshold reports.
    pub fn new(report_every: u64) -> Self {
        Self {
            state: Arc::new(RwLock::new(AnalyticsState::new())),
            report_every,
        }
    }

    /// Applies one event. Returns a snapshot when a threshold report is due.
    pub async fn record(&self, event: &SagaEvent) -> Option<AnalyticsSnapshot> {
        let mut state = self.state.write().await;
        let before = state.report_counter();
        state.apply(event);
        let after = state.report_counter();

        let due = self.report_every > 0 && after != before && after % self.report_every == 0;
        due.then(|| state.snapshot())
    }

    pub async fn snapshot(&self) -> AnalyticsSnapshot {
        self.state.read().await.snapshot()
    }

    /// Subscribes to every topic on `bus` and starts consuming.
    pub async fn subscribe<B: EventBus>(&self, bus: &B) -> Result<SubscriptionHandle> {
        let topics = Topic::names(&Topic::ALL);
        let subscription = bus.subscribe(CONSUMER_GROUP, &topics).await?;
        tracing::info!(group = CONSUMER_GROUP, "analytics subscribed");
        Ok(subscription.run(Arc::new(self.clone())))
    }
}

impl Default for AnalyticsAggregator {
    fn default() -> Self {
        Self::new(DEFAULT_REPORT_EVERY)
    }
}

#[async_trait]
impl MessageHandler for AnalyticsAggregator {
    #[tracing::instrument(
        skip(self, message),
        fields(topic = %message.topic, offset = message.offset)
    )]
    async fn on_message(&self, message: &Message) -> event_bus::Result<()> {
        let event = match SagaEvent::from_message(message) {
            Ok(envelope) => envelope.payload,
            Err(e) => {
                tracing::warn!(error = %e, "analytics skipped malformed message");
                metrics::counter!("analytics_malformed_messages_total").increment(1);
                return Ok(());
            }
        };

        metrics::counter!("analytics_events_total", "topic" => event.topic().as_str()).increment(1);
        if let Some(snapshot) = self.record(&event).await {
            log_report(&snapshot);
        }
        Ok(())
    }
}
