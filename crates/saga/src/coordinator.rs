//! Order lifecycle coordinator.
//!
//! Originates new orders and is the only participant that emits terminal
//! events. It holds no per-order state: each decision depends only on the
//! event in hand.

use async_trait::async_trait;
use common::EventId;
use domain::{Order, OrderCompleted, OrderFailed, OrderId, SagaEvent, Topic};
use event_bus::EventBus;

use crate::{Publisher, Result, SagaError, SagaService};

pub const PAYMENT_FAILED: &str = "Payment failed";
pub const INVENTORY_FAILED: &str = "Inventory update failed";
pub const SHIPPING_FAILED: &str = "Shipping preparation failed";

/// Turns stage outcomes into `order-completed` or `order-failed`.
///
/// Redelivered stage events can produce a second terminal event for the
/// same order; consumers treat the first one as authoritative.
#[derive(Debug, Default, Clone, Copy)]
pub struct OrderCoordinator;

impl OrderCoordinator {
    pub fn new() -> Self {
        Self
    }

    /// Publishes `order-created` for a new order.
    #[tracing::instrument(skip_all, fields(order_id = %order.id))]
    pub async fn place_order<B: EventBus>(
        &self,
        publisher: &Publisher<B>,
        order: Order,
    ) -> Result<EventId> {
        let items = order.items.len();
        let total = order.total_amount;
        let event_id = publisher.publish(&SagaEvent::OrderCreated(order)).await?;
        metrics::counter!("saga_orders_created_total").increment(1);
        tracing::info!(items, %total, "order created");
        Ok(event_id)
    }

    /// The terminal event, if any, that `event` calls for.
    pub fn decide(&self, event: &SagaEvent) -> Option<SagaEvent> {
        let failed = |order_id: OrderId, reason: &str| {
            Some(SagaEvent::OrderFailed(OrderFailed::new(order_id, reason)))
        };
        match event {
            SagaEvent::PaymentProcessed(p) if !p.status.is_success() => {
                failed(p.order_id, PAYMENT_FAILED)
            }
            SagaEvent::InventoryUpdated(i) if !i.status.is_success() => {
                failed(i.order_id, INVENTORY_FAILED)
            }
            SagaEvent::ShippingPrepared(s) if !s.status.is_success() => {
                failed(s.order_id, SHIPPING_FAILED)
            }
            SagaEvent::ShippingPrepared(s) => {
                Some(SagaEvent::OrderCompleted(OrderCompleted::now(s.order_id)))
            }
            _ => None,
        }
    }
}

#[async_trait]
impl SagaService for OrderCoordinator {
    fn name(&self) -> &'static str {
        "order"
    }

    fn topics(&self) -> &'static [Topic] {
        &[
            Topic::PaymentProcessed,
            Topic::InventoryUpdated,
            Topic::ShippingPrepared,
            Topic::OrderFailed,
        ]
    }

    async fn handle(&self, event: SagaEvent) -> Result<Option<SagaEvent>> {
        if !self.topics().contains(&event.topic()) {
            return Err(SagaError::UnexpectedEvent {
                service: self.name(),
                topic: event.topic(),
            });
        }

        if let SagaEvent::OrderFailed(failed) = &event {
            tracing::info!(order_id = %failed.order_id, reason = %failed.reason, "order failed");
            return Ok(None);
        }

        let decision = self.decide(&event);
        match &decision {
            Some(SagaEvent::OrderCompleted(c)) => {
                metrics::counter!("saga_terminal_events_total", "outcome" => "completed")
                    .increment(1);
                tracing::info!(order_id = %c.order_id, "order completed");
            }
            Some(SagaEvent::OrderFailed(f)) => {
                metrics::counter!("saga_terminal_events_total", "outcome" => "failed").increment(1);
                tracing::warn!(
                    order_id = %f.order_id,
                    reason = %f.reason,
                    "stage failed, failing order"
                );
            }
            _ => tracing::debug!(
                topic = %event.topic(),
                order_id = %event.order_id(),
                "stage succeeded"
            ),
        }
        Ok(decision)
    }
}
