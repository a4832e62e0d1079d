use domain::DomainError;
use event_bus::EventBusError;
use thiserror::Error;

/// Errors raised by the analytics consumer.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// A message could not be decoded into a saga event.
    #[error("Undecodable message: {0}")]
    Decode(#[from] DomainError),

    /// Subscribing to the bus failed.
    #[error("Event bus error: {0}")]
    EventBus(#[from] EventBusError),
}

pub type Result<T> = std::result::Result<T, AnalyticsError>;
