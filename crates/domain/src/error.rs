//! Domain error types.

use event_bus::EventBusError;
use thiserror::Error;

use crate::Topic;

/// Errors that can occur when building or decoding domain data.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A line item violates the quantity or price rules.
    #[error("Invalid line item '{product_id}': {reason}")]
    InvalidLineItem { product_id: String, reason: String },

    /// An order was created without line items.
    #[error("Order must contain at least one line item")]
    NoItems,

    /// A message arrived on a topic this system does not know.
    #[error("Unknown topic: {0}")]
    UnknownTopic(String),

    /// A message payload could not be decoded for its topic.
    #[error("Malformed {topic} payload: {source}")]
    Decode {
        topic: Topic,
        #[source]
        source: EventBusError,
    },

    /// An event could not be encoded.
    #[error("Encoding error: {0}")]
    Encode(#[from] EventBusError),
}

/// Result type for domain operations.
pub type Result<T> = std::result::Result<T, DomainError>;
