//! Publishes saga events to their topics.

use common::EventId;
use domain::SagaEvent;
use event_bus::EventBus;

use crate::Result;

/// Which value is used as the bus partitioning key.
///
/// Keying by event id spreads an order's events across partitions, so two
/// events for the same order carry no relative ordering guarantee. Keying
/// by order id keeps them on one partition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PartitionKey {
    #[default]
    EventId,
    OrderId,
}

/// Wraps events in envelopes and publishes them.
#[derive(Clone)]
pub struct Publisher<B> {
    bus: B,
    key: PartitionKey,
}

impl<B: EventBus> Publisher<B> {
    pub fn new(bus: B, key: PartitionKey) -> Self {
        Self { bus, key }
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn partition_key(&self) -> PartitionKey {
        self.key
    }

    /// Publishes `event` on its topic and returns the new event id.
    #[tracing::instrument(
        skip(self, event),
        fields(topic = %event.topic(), order_id = %event.order_id())
    )]
    pub async fn publish(&self, event: &SagaEvent) -> Result<EventId> {
        let (envelope, bytes) = event.encode()?;
        let topic = event.topic();
        let key = match self.key {
            PartitionKey::EventId => envelope.event_id.to_string(),
            PartitionKey::OrderId => event.order_id().to_string(),
        };

        let position = self.bus.publish(topic.as_str(), &key, bytes).await?;

        metrics::counter!("saga_events_published_total", "topic" => topic.as_str()).increment(1);
        tracing::debug!(
            event_id = %envelope.event_id,
            partition = position.partition,
            offset = position.offset,
            "event published"
        );
        Ok(envelope.event_id)
    }
}
