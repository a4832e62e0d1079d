use chrono::{DateTime, Utc};
use domain::Money;
use serde::Serialize;

use crate::ProductCount;

/// Point-in-time copy of the analytics counters.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSnapshot {
    pub total_orders: u64,
    pub successful_orders: u64,
    pub failed_orders: u64,
    pub total_revenue: Money,
    pub average_order_value: Money,
    /// Fraction in `0.0..=1.0`.
    pub payment_success_rate: f64,
    pub notifications_sent: u64,
    pub notifications_failed: u64,
    pub top_products: Vec<ProductCount>,
    pub events_processed: u64,
    pub generated_at: DateTime<Utc>,
}

impl AnalyticsSnapshot {
    /// Payment success rate as a percentage.
    pub fn payment_success_percent(&self) -> f64 {
        self.payment_success_rate * 100.0
    }
}
