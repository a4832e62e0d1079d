//! Domain layer for the order fulfillment pipeline.
//!
//! This crate provides:
//! - The order model: [`Order`], [`LineItem`], [`Customer`], [`Money`]
//! - The [`Topic`] catalogue shared by every service
//! - Stage payloads and the topic-directed [`SagaEvent`] decoder
//! - [`OrderLifecycle`], which derives an order's status from its events

pub mod error;
pub mod events;
pub mod lifecycle;
pub mod order;
pub mod topic;

pub use common::{CustomerId, EventId, OrderId};
pub use error::{DomainError, Result};
pub use events::{
    Channel, DeliveryStatus, InventoryUpdated, NotificationSent, NotificationType,
    OrderCompleted, OrderFailed, PaymentProcessed, SagaEvent, ShippingPrepared, StageStatus,
};
pub use lifecycle::{OrderLifecycle, OrderStatus};
pub use order::{Address, Customer, LineItem, Money, Order, ProductId};
pub use topic::Topic;
