//! Choreographed saga for order fulfillment.
//!
//! There is no orchestrator. Each participant subscribes to the topics it
//! cares about and publishes its own outcome:
//!
//! ```text
//! order-created ──► PaymentProcessor ──► payment-processed
//! payment-processed ──► InventoryManager ──► inventory-updated
//! inventory-updated ──► ShipmentPreparer ──► shipping-prepared
//! payment/inventory/shipping outcomes ──► OrderCoordinator ──► order-completed | order-failed
//! payment/shipping/completed/failed ──► NotificationDispatcher ──► notification-sent
//! ```
//!
//! Stage failures are ordinary data (`status: FAILED`). Only the
//! [`OrderCoordinator`] turns them into a terminal `order-failed` event.

pub mod coordinator;
pub mod error;
pub mod generator;
pub mod latency;
pub mod ledger;
pub mod pipeline;
pub mod publisher;
pub mod randomness;
pub mod service;
pub mod services;

pub use coordinator::OrderCoordinator;
pub use error::{Result, SagaError};
pub use generator::OrderGenerator;
pub use latency::Latency;
pub use ledger::{InventoryLedger, StockChange};
pub use pipeline::{PipelineOptions, SagaPipeline};
pub use publisher::{PartitionKey, Publisher};
pub use randomness::{FastRandom, Randomness, ScriptedRandomness, Stage};
pub use service::{SagaService, ServiceHandler, consumer_group, start_service};
pub use services::{InventoryManager, NotificationDispatcher, PaymentProcessor, ShipmentPreparer};
