//! Analytics counters.

use chrono::Utc;
use domain::{DeliveryStatus, Money, SagaEvent};

use crate::{AnalyticsSnapshot, ProductPopularity, TOP_PRODUCTS};

/// Counters and derived ratios, updated one event at a time.
///
/// Average order value and payment success rate are recomputed only when a
/// successful payment is seen, so between payments they reflect the terminal
/// counts at the time of the last one.
#[derive(Debug, Clone)]
pub struct AnalyticsState {
    total_orders: u64,
    successful_orders: u64,
    failed_orders: u64,
    total_revenue: Money,
    average_order_value: Money,
    payment_success_rate: f64,
    notifications_sent: u64,
    notifications_failed: u64,
    popularity: ProductPopularity,
    events_processed: u64,
}

impl Default for AnalyticsState {
    fn default() -> Self {
        Self {
            total_orders: 0,
            successful_orders: 0,
            failed_orders: 0,
            total_revenue: Money::zero(),
            average_order_value: Money::zero(),
            payment_success_rate: 0.0,
            notifications_sent: 0,
            notifications_failed: 0,
            popularity: ProductPopularity::new(),
            events_processed: 0,
        }
    }
}

impl AnalyticsState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one event into the counters.
    pub fn apply(&mut self, event: &SagaEvent) {
        self.events_processed += 1;
        match event {
            SagaEvent::OrderCreated(_) => self.total_orders += 1,
            SagaEvent::OrderCompleted(_) => self.successful_orders += 1,
            SagaEvent::OrderFailed(_) => self.failed_orders += 1,
            SagaEvent::PaymentProcessed(payment) if payment.status.is_success() => {
                self.total_revenue += payment.amount;
                self.recompute_ratios();
                for item in &payment.products {
                    self.popularity.record(&item.product_id);
                }
            }
            SagaEvent::NotificationSent(notification) => match notification.status {
                DeliveryStatus::Sent => self.notifications_sent += 1,
                DeliveryStatus::Failed => self.notifications_failed += 1,
            },
            SagaEvent::PaymentProcessed(_)
            | SagaEvent::InventoryUpdated(_)
            | SagaEvent::ShippingPrepared(_) => {}
        }
    }

    fn recompute_ratios(&mut self) {
        self.average_order_value = if self.successful_orders == 0 {
            Money::zero()
        } else {
            let cents = self.total_revenue.cents() as f64 / self.successful_orders as f64;
            Money::from_cents(cents.round() as i64)
        };

        let decided = self.successful_orders + self.failed_orders;
        self.payment_success_rate = if decided == 0 {
            0.0
        } else {
            self.successful_orders as f64 / decided as f64
        };
    }

    pub fn total_orders(&self) -> u64 {
        self.total_orders
    }

    pub fn successful_orders(&self) -> u64 {
        self.successful_orders
    }

    pub fn failed_orders(&self) -> u64 {
        self.failed_orders
    }

    pub fn notifications_sent(&self) -> u64 {
        self.notifications_sent
    }

    /// Orders created plus notifications delivered; drives threshold reports.
    pub fn report_counter(&self) -> u64 {
        self.total_orders + self.notifications_sent
    }

    pub fn popularity(&self) -> &ProductPopularity {
        &self.popularity
    }

    pub fn snapshot(&self) -> AnalyticsSnapshot {
        AnalyticsSnapshot {
            total_orders: self.total_orders,
            successful_orders: self.successful_orders,
            failed_orders: self.failed_orders,
            total_revenue: self.total_revenue,
            average_order_value: self.average_order_value,
            payment_success_rate: self.payment_success_rate,
            notifications_sent: self.notifications_sent,
            notifications_failed: self.notifications_failed,
            top_products: self.popularity.top(TOP_PRODUCTS),
            events_processed: self.events_processed,
            generated_at: Utc::now(),
        }
    }
}
