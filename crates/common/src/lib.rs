//! Shared identifier types used by every crate in the pipeline.

pub mod types;

pub use types::{CustomerId, EventId, IdParseError, OrderId};
