//! Saga error types.

use domain::{DomainError, Topic};
use event_bus::EventBusError;
use thiserror::Error;

/// Errors raised by saga participants.
///
/// A stage resolving to `FAILED` is not an error; it is published as data.
#[derive(Debug, Error)]
pub enum SagaError {
    /// A service received an event from a topic it does not consume.
    #[error("{service} does not handle events from '{topic}'")]
    UnexpectedEvent { service: &'static str, topic: Topic },

    /// Domain error.
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    /// Event bus error.
    #[error("Event bus error: {0}")]
    EventBus(#[from] EventBusError),
}

/// Convenience type alias for saga results.
pub type Result<T> = std::result::Result<T, SagaError>;
