//! Event bus for the order fulfillment pipeline.
//!
//! Services never call each other. They publish JSON envelopes to named
//! topics and react to the envelopes delivered on the topics they subscribe
//! to. This crate defines that seam:
//! - [`EventBus`]: `publish` and `subscribe` with a consumer group
//! - [`MessageHandler`]: the `on_message` callback, invoked once per delivery
//! - [`EventEnvelope`]: the wire codec that stamps event id and timestamp
//! - [`InMemoryEventBus`]: partitioned append-only topic logs with
//!   at-least-once delivery and bounded retry

pub mod bus;
pub mod config;
pub mod envelope;
pub mod error;
pub mod memory;
pub mod retry;

pub use bus::{
    EventBus, Message, MessageHandler, MessagePosition, MessageStream, Subscription,
    SubscriptionHandle,
};
pub use common::EventId;
pub use config::BusConfig;
pub use envelope::EventEnvelope;
pub use error::{EventBusError, Result};
pub use memory::InMemoryEventBus;
pub use retry::RetryPolicy;
