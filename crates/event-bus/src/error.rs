use thiserror::Error;

/// Errors that can occur when interacting with the event bus.
#[derive(Debug, Error)]
pub enum EventBusError {
    /// The bus configuration is unusable.
    #[error("Invalid bus configuration: {0}")]
    InvalidConfig(String),

    /// The bus is not accepting publishes or subscriptions.
    #[error("Bus connection error: {0}")]
    Connection(String),

    /// A consumer group tried to subscribe to a topic twice.
    #[error("Consumer group '{group}' is already subscribed to topic '{topic}'")]
    AlreadySubscribed { group: String, topic: String },

    /// A message handler failed; the message is eligible for redelivery.
    #[error("Handler error: {0}")]
    Handler(String),

    /// An envelope could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for event bus operations.
pub type Result<T> = std::result::Result<T, EventBusError>;
