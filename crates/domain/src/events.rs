//! Stage payloads published on each topic, and the decoder that maps a
//! topic's raw bytes to the matching payload type.

use chrono::{DateTime, Utc};
use event_bus::{EventEnvelope, Message};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::{
    Address, Customer, DomainError, LineItem, Money, Order, OrderId, OrderStatus, Result, Topic,
};

/// Outcome of a payment, inventory, or shipping stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StageStatus {
    Success,
    Failed,
}

impl StageStatus {
    pub fn from_success(success: bool) -> Self {
        if success {
            StageStatus::Success
        } else {
            StageStatus::Failed
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, StageStatus::Success)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StageStatus::Success => "SUCCESS",
            StageStatus::Failed => "FAILED",
        }
    }
}

/// Occasion a notification is sent for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationType {
    PaymentConfirmation,
    ShippingConfirmation,
    OrderCompleted,
    OrderFailed,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::PaymentConfirmation => "PAYMENT_CONFIRMATION",
            NotificationType::ShippingConfirmation => "SHIPPING_CONFIRMATION",
            NotificationType::OrderCompleted => "ORDER_COMPLETED",
            NotificationType::OrderFailed => "ORDER_FAILED",
        }
    }
}

/// Delivery channel for a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Channel {
    Email,
    Sms,
}

/// Whether a notification reached its recipient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryStatus {
    Sent,
    Failed,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Sent => "SENT",
            DeliveryStatus::Failed => "FAILED",
        }
    }
}

/// Published on `payment-processed`.
///
/// Carries the line items and customer so later stages never need to look
/// the order up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentProcessed {
    pub order_id: OrderId,
    pub status: StageStatus,
    pub provider: String,
    pub transaction_id: String,
    pub amount: Money,
    pub currency: String,
    pub products: Vec<LineItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer: Option<Customer>,
}

/// Published on `inventory-updated`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryUpdated {
    pub order_id: OrderId,
    pub status: StageStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default)]
    pub products: Vec<LineItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer: Option<Customer>,
}

/// Published on `shipping-prepared`.
///
/// Shipment details are present only when `status` is `SUCCESS`; a failure
/// carries `reason` instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingPrepared {
    pub order_id: OrderId,
    pub status: StageStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracking_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carrier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_delivery: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer: Option<Customer>,
}

/// Published on `order-completed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCompleted {
    pub order_id: OrderId,
    pub status: OrderStatus,
    pub completed_at: DateTime<Utc>,
}

impl OrderCompleted {
    pub fn now(order_id: OrderId) -> Self {
        Self {
            order_id,
            status: OrderStatus::Completed,
            completed_at: Utc::now(),
        }
    }
}

/// Published on `order-failed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderFailed {
    pub order_id: OrderId,
    pub reason: String,
    pub status: OrderStatus,
}

impl OrderFailed {
    pub fn new(order_id: OrderId, reason: impl Into<String>) -> Self {
        Self {
            order_id,
            reason: reason.into(),
            status: OrderStatus::Failed,
        }
    }
}

/// Published on `notification-sent`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationSent {
    pub order_id: OrderId,
    pub notification_type: NotificationType,
    pub recipient: String,
    pub channel: Channel,
    pub status: DeliveryStatus,
    pub sent_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracking_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carrier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Any payload that travels through the saga, tagged by its topic.
///
/// Serializes as the bare payload; the topic lives outside the JSON, so
/// decoding always goes through [`SagaEvent::decode`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SagaEvent {
    OrderCreated(Order),
    PaymentProcessed(PaymentProcessed),
    InventoryUpdated(InventoryUpdated),
    ShippingPrepared(ShippingPrepared),
    OrderCompleted(OrderCompleted),
    OrderFailed(OrderFailed),
    NotificationSent(NotificationSent),
}

impl SagaEvent {
    /// The topic this event is published on.
    pub fn topic(&self) -> Topic {
        match self {
            SagaEvent::OrderCreated(_) => Topic::OrderCreated,
            SagaEvent::PaymentProcessed(_) => Topic::PaymentProcessed,
            SagaEvent::InventoryUpdated(_) => Topic::InventoryUpdated,
            SagaEvent::ShippingPrepared(_) => Topic::ShippingPrepared,
            SagaEvent::OrderCompleted(_) => Topic::OrderCompleted,
            SagaEvent::OrderFailed(_) => Topic::OrderFailed,
            SagaEvent::NotificationSent(_) => Topic::NotificationSent,
        }
    }

    /// The order this event is about.
    pub fn order_id(&self) -> OrderId {
        match self {
            SagaEvent::OrderCreated(order) => order.id,
            SagaEvent::PaymentProcessed(e) => e.order_id,
            SagaEvent::InventoryUpdated(e) => e.order_id,
            SagaEvent::ShippingPrepared(e) => e.order_id,
            SagaEvent::OrderCompleted(e) => e.order_id,
            SagaEvent::OrderFailed(e) => e.order_id,
            SagaEvent::NotificationSent(e) => e.order_id,
        }
    }

    /// Wraps the event in a fresh envelope and encodes it.
    pub fn encode(&self) -> Result<(EventEnvelope<&SagaEvent>, Vec<u8>)> {
        let envelope = EventEnvelope::new(self);
        let bytes = envelope.encode()?;
        Ok((envelope, bytes))
    }

    /// Decodes raw bytes received on `topic` into the matching payload.
    pub fn decode(topic: Topic, bytes: &[u8]) -> Result<EventEnvelope<SagaEvent>> {
        let decoded = match topic {
            Topic::OrderCreated => typed(bytes, SagaEvent::OrderCreated),
            Topic::PaymentProcessed => typed(bytes, SagaEvent::PaymentProcessed),
            Topic::InventoryUpdated => typed(bytes, SagaEvent::InventoryUpdated),
            Topic::ShippingPrepared => typed(bytes, SagaEvent::ShippingPrepared),
            Topic::OrderCompleted => typed(bytes, SagaEvent::OrderCompleted),
            Topic::OrderFailed => typed(bytes, SagaEvent::OrderFailed),
            Topic::NotificationSent => typed(bytes, SagaEvent::NotificationSent),
        };
        decoded.map_err(|source| DomainError::Decode { topic, source })
    }

    /// Decodes a delivered bus message, resolving its topic first.
    pub fn from_message(message: &Message) -> Result<EventEnvelope<SagaEvent>> {
        let topic: Topic = message.topic.parse()?;
        Self::decode(topic, &message.payload)
    }
}

fn typed<T: DeserializeOwned>(
    bytes: &[u8],
    wrap: fn(T) -> SagaEvent,
) -> event_bus::Result<EventEnvelope<SagaEvent>> {
    Ok(EventEnvelope::<T>::decode(bytes)?.map(wrap))
}
