//! Order status derived from the event log.
//!
//! No service stores an order's status. Any reader can fold the events that
//! mention an order into an [`OrderLifecycle`] to recover it.

use serde::{Deserialize, Serialize};

use crate::{OrderId, SagaEvent};

/// Logical lifecycle of an order.
///
/// ```text
/// Created ──► Payment{Succeeded,Failed} ──► Inventory{Succeeded,Failed}
///         ──► Shipping{Succeeded,Failed} ──► Completed | Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Created,
    PaymentSucceeded,
    PaymentFailed,
    InventorySucceeded,
    InventoryFailed,
    ShippingSucceeded,
    ShippingFailed,
    Completed,
    Failed,
}

impl OrderStatus {
    /// How far through the saga this status is.
    fn stage(&self) -> u8 {
        match self {
            OrderStatus::Created => 0,
            OrderStatus::PaymentSucceeded | OrderStatus::PaymentFailed => 1,
            OrderStatus::InventorySucceeded | OrderStatus::InventoryFailed => 2,
            OrderStatus::ShippingSucceeded | OrderStatus::ShippingFailed => 3,
            OrderStatus::Completed | OrderStatus::Failed => 4,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Created => "CREATED",
            OrderStatus::PaymentSucceeded => "PAYMENT_SUCCEEDED",
            OrderStatus::PaymentFailed => "PAYMENT_FAILED",
            OrderStatus::InventorySucceeded => "INVENTORY_SUCCEEDED",
            OrderStatus::InventoryFailed => "INVENTORY_FAILED",
            OrderStatus::ShippingSucceeded => "SHIPPING_SUCCEEDED",
            OrderStatus::ShippingFailed => "SHIPPING_FAILED",
            OrderStatus::Completed => "COMPLETED",
            OrderStatus::Failed => "FAILED",
        }
    }

    /// The status an event implies for its order, if any.
    pub fn implied_by(event: &SagaEvent) -> Option<OrderStatus> {
        let status = match event {
            SagaEvent::OrderCreated(_) => OrderStatus::Created,
            SagaEvent::PaymentProcessed(e) if e.status.is_success() => {
                OrderStatus::PaymentSucceeded
            }
            SagaEvent::PaymentProcessed(_) => OrderStatus::PaymentFailed,
            SagaEvent::InventoryUpdated(e) if e.status.is_success() => {
                OrderStatus::InventorySucceeded
            }
            SagaEvent::InventoryUpdated(_) => OrderStatus::InventoryFailed,
            SagaEvent::ShippingPrepared(e) if e.status.is_success() => {
                OrderStatus::ShippingSucceeded
            }
            SagaEvent::ShippingPrepared(_) => OrderStatus::ShippingFailed,
            SagaEvent::OrderCompleted(_) => OrderStatus::Completed,
            SagaEvent::OrderFailed(_) => OrderStatus::Failed,
            SagaEvent::NotificationSent(_) => return None,
        };
        Some(status)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of one order reconstructed from its events.
///
/// Events may arrive late or out of order, so the status only ever moves
/// forward through the stages, and the first terminal status sticks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderLifecycle {
    order_id: OrderId,
    status: Option<OrderStatus>,
    failure_reason: Option<String>,
    completions: usize,
    failures: usize,
    notifications: usize,
    events_applied: usize,
}

impl OrderLifecycle {
    pub fn new(order_id: OrderId) -> Self {
        Self {
            order_id,
            status: None,
            failure_reason: None,
            completions: 0,
            failures: 0,
            notifications: 0,
            events_applied: 0,
        }
    }

    /// Folds `events` for `order_id`, ignoring events about other orders.
    pub fn fold<'a>(order_id: OrderId, events: impl IntoIterator<Item = &'a SagaEvent>) -> Self {
        let mut lifecycle = Self::new(order_id);
        for event in events {
            lifecycle.apply(event);
        }
        lifecycle
    }

    /// Applies one event. Returns true if the event was about this order.
    pub fn apply(&mut self, event: &SagaEvent) -> bool {
        if event.order_id() != self.order_id {
            return false;
        }
        self.events_applied += 1;

        match event {
            SagaEvent::OrderCompleted(_) => self.completions += 1,
            SagaEvent::OrderFailed(failed) => {
                self.failures += 1;
                if self.failure_reason.is_none() {
                    self.failure_reason = Some(failed.reason.clone());
                }
            }
            SagaEvent::NotificationSent(_) => self.notifications += 1,
            _ => {}
        }

        if let Some(next) = OrderStatus::implied_by(event) {
            let advance = match self.status {
                None => true,
                Some(current) => next.stage() > current.stage(),
            };
            if advance {
                self.status = Some(next);
            }
        }
        true
    }

    pub fn order_id(&self) -> OrderId {
        self.order_id
    }

    /// The derived status, or `None` if no status-bearing event was seen.
    pub fn status(&self) -> Option<OrderStatus> {
        self.status
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_some_and(|s| s.is_terminal())
    }

    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }

    /// Number of `order-completed` events observed.
    pub fn completions(&self) -> usize {
        self.completions
    }

    /// Number of `order-failed` events observed.
    pub fn failures(&self) -> usize {
        self.failures
    }

    pub fn notifications(&self) -> usize {
        self.notifications
    }

    pub fn events_applied(&self) -> usize {
        self.events_applied
    }
}
