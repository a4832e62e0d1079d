//! Shipment preparation.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use domain::{InventoryUpdated, SagaEvent, ShippingPrepared, StageStatus, Topic};

use crate::randomness::random_string;
use crate::{Latency, Randomness, Result, SagaError, SagaService, Stage};

pub const CARRIERS: [&str; 4] = ["AnPost", "UPS", "DPD", "Fastway"];
pub const SUCCESS_RATE: f64 = 0.95;
pub const LATENCY: Latency = Latency::millis(700, 1900);
pub const FAILURE_REASON: &str = "Unable to prepare shipment";

const TRACKING_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const TRACKING_LENGTH: usize = 12;

/// Books shipments for orders whose stock was reserved.
pub struct ShipmentPreparer {
    rng: Arc<dyn Randomness>,
    latency: Latency,
    success_rate: f64,
}

impl ShipmentPreparer {
    pub fn new(rng: Arc<dyn Randomness>) -> Self {
        Self {
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

    #[tracing::instrument(skip_all, fields(order_id = %inventory.order_id))]
    pub async fn process(&self, inventory: InventoryUpdated) -> ShippingPrepared {
        let carrier = CARRIERS[self.rng.pick(CARRIERS.len())];
        self.latency.simulate(self.rng.as_ref()).await;

        let status =
            StageStatus::from_success(self.rng.succeeds(Stage::Shipping, self.success_rate));
        metrics::counter!(
            "saga_stage_outcomes_total",
            "stage" => "shipping",
            "status" => status.as_str()
        )
        .increment(1);

        if !status.is_success() {
            tracing::warn!("shipment could not be prepared");
            return ShippingPrepared {
                order_id: inventory.order_id,
                status,
                tracking_number: None,
                carrier: None,
                estimated_delivery: None,
                address: None,
                reason: Some(FAILURE_REASON.to_string()),
                customer: inventory.customer,
            };
        }

        let tracking_number = random_string(self.rng.as_ref(), TRACKING_ALPHABET, TRACKING_LENGTH);
        let days = self.rng.between(2, 6) as i64;
        let estimated_delivery = Utc::now() + Duration::days(days);
        let address = inventory.customer.as_ref().and_then(|c| c.address.clone());
        tracing::info!(%carrier, %tracking_number, days, "shipment prepared");

        ShippingPrepared {
            order_id: inventory.order_id,
            status,
            tracking_number: Some(tracking_number),
            carrier: Some(carrier.to_string()),
            estimated_delivery: Some(estimated_delivery),
            address,
            reason: None,
            customer: inventory.customer,
        }
    }
}

#[async_trait]
impl SagaService for ShipmentPreparer {
    fn name(&self) -> &'static str {
        "shipping"
    }

    fn topics(&self) -> &'static [Topic] {
        &[Topic::InventoryUpdated]
    }

    async fn handle(&self, event: SagaEvent) -> Result<Option<SagaEvent>> {
        match event {
            SagaEvent::InventoryUpdated(inventory) if inventory.status.is_success() => Ok(Some(
                SagaEvent::ShippingPrepared(self.process(inventory).await),
            )),
            SagaEvent::InventoryUpdated(_) => Ok(None),
            other => Err(SagaError::UnexpectedEvent {
                service: self.name(),
                topic: other.topic(),
            }),
        }
    }
}
