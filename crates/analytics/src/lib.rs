//! Streaming analytics over every saga topic.
//!
//! - [`AnalyticsState`] owns the counters and the product popularity table
//! - [`AnalyticsAggregator`] feeds bus messages into the state and decides
//!   when a report is due
//! - [`spawn_reporter`] emits a report on a fixed interval
//!
//! Nothing is persisted; counters live for the lifetime of the process.

pub mod aggregator;
pub mod error;
pub mod popularity;
pub mod reporter;
pub mod snapshot;
pub mod state;

pub use aggregator::{AnalyticsAggregator, CONSUMER_GROUP, DEFAULT_REPORT_EVERY};
pub use error::{AnalyticsError, Result};
pub use popularity::{ProductCount, ProductPopularity, TOP_PRODUCTS};
pub use reporter::{log_report, spawn_reporter};
pub use snapshot::AnalyticsSnapshot;
pub use state::AnalyticsState;
