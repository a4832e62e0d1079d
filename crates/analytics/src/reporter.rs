//! Periodic analytics reports.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::{AnalyticsAggregator, AnalyticsSnapshot};

/// Logs a snapshot as a structured report.
pub fn log_report(snapshot: &AnalyticsSnapshot) {
    metrics::counter!("analytics_reports_total").increment(1);
    tracing::info!(
        total_orders = snapshot.total_orders,
        successful_orders = snapshot.successful_orders,
        failed_orders = snapshot.failed_orders,
        total_revenue = %snapshot.total_revenue,
        average_order_value = %snapshot.average_order_value,
        payment_success_percent = snapshot.payment_success_percent(),
        notifications_sent = snapshot.notifications_sent,
        notifications_failed = snapshot.notifications_failed,
        "analytics report"
    );
    for (rank, product) in snapshot.top_products.iter().enumerate() {
        tracing::info!(
            rank = rank + 1,
            product = %product.product_id,
            count = product.count,
            "top product"
        );
    }
}

/// Logs a report every `period` until the task is aborted.
pub fn spawn_reporter(aggregator: AnalyticsAggregator, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // first tick fires immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            log_report(&aggregator.snapshot().await);
        }
    })
}
