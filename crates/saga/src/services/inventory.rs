//! Inventory reservation.

use std::sync::Arc;

use async_trait::async_trait;
use domain::{InventoryUpdated, PaymentProcessed, SagaEvent, StageStatus, Topic};

use crate::ledger::CATALOG_SIZE;
use crate::{InventoryLedger, Latency, Randomness, Result, SagaError, SagaService, Stage};

pub const SUCCESS_RATE: f64 = 0.8;
pub const LATENCY: Latency = Latency::millis(500, 1500);
pub const FAILURE_REASON: &str = "Inventory update failed";

/// Decrements stock for paid orders.
pub struct InventoryManager {
    ledger: Arc<InventoryLedger>,
    rng: Arc<dyn Randomness>,
    latency: Latency,
    success_rate: f64,
}

impl InventoryManager {
    /// Creates a manager with a freshly seeded catalog.
    pub fn new(rng: Arc<dyn Randomness>) -> Self {
        let ledger = InventoryLedger::with_catalog(CATALOG_SIZE, rng.as_ref());
        Self::with_ledger(Arc::new(ledger), rng)
    }

    pub fn with_ledger(ledger: Arc<InventoryLedger>, rng: Arc<dyn Randomness>) -> Self {
        Self {
            ledger,
            rng,
            latency: LATENCY,
            success_rate: SUCCESS_RATE,
        }
    }

    pub fn with_latency(mut self, latency: Latency) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_success_rate(mut self, success_rate: f64) -> Self {
        self.success_rate = success_rate;
        self
    }

    pub fn ledger(&self) -> &Arc<InventoryLedger> {
        &self.ledger
    }

    /// Reserves stock for a paid order. Stock is only touched on success.
    #[tracing::instrument(skip_all, fields(order_id = %payment.order_id))]
    pub async fn process(&self, payment: PaymentProcessed) -> InventoryUpdated {
        self.latency.simulate(self.rng.as_ref()).await;

        let status =
            StageStatus::from_success(self.rng.succeeds(Stage::Inventory, self.success_rate));
        let reason = if status.is_success() {
            for change in self.ledger.apply(&payment.products, self.rng.as_ref()) {
                tracing::debug!(
                    product = %change.product_id,
                    quantity = change.quantity,
                    remaining = change.remaining,
                    "stock decremented"
                );
            }
            None
        } else {
            Some(FAILURE_REASON.to_string())
        };

        metrics::counter!(
            "saga_stage_outcomes_total",
            "stage" => "inventory",
            "status" => status.as_str()
        )
        .increment(1);
        tracing::info!(
            status = status.as_str(),
            items = payment.products.len(),
            "inventory updated"
        );

        InventoryUpdated {
            order_id: payment.order_id,
            status,
            reason,
            products: payment.products,
            customer: payment.customer,
        }
    }
}

#[async_trait]
impl SagaService for InventoryManager {
    fn name(&self) -> &'static str {
        "inventory"
    }

    fn topics(&self) -> &'static [Topic] {
        &[Topic::PaymentProcessed]
    }

    async fn handle(&self, event: SagaEvent) -> Result<Option<SagaEvent>> {
        match event {
            SagaEvent::PaymentProcessed(payment) if payment.status.is_success() => Ok(Some(
                SagaEvent::InventoryUpdated(self.process(payment).await),
            )),
            SagaEvent::PaymentProcessed(payment) => {
                tracing::debug!(order_id = %payment.order_id, "payment failed, nothing to reserve");
                Ok(None)
            }
            other => Err(SagaError::UnexpectedEvent {
                service: self.name(),
                topic: other.topic(),
            }),
        }
    }
}
