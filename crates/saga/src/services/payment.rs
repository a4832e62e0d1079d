//! Payment processing.

use std::sync::Arc;

use async_trait::async_trait;
use domain::{Order, PaymentProcessed, SagaEvent, StageStatus, Topic};

use crate::randomness::random_string;
use crate::{Latency, Randomness, Result, SagaError, SagaService, Stage};

pub const PROVIDERS: [&str; 4] = ["Stripe", "PayPal", "Visa", "MasterCard"];
pub const SUCCESS_RATE: f64 = 0.9;
pub const CURRENCY: &str = "EUR";
pub const LATENCY: Latency = Latency::millis(500, 2000);

const TRANSACTION_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Charges new orders through a randomly chosen provider.
pub struct PaymentProcessor {
    rng: Arc<dyn Randomness>,
    latency: Latency,
    success_rate: f64,
}

impl PaymentProcessor {
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

    /// Charges the order total. A decline is reported as `FAILED`.
    #[tracing::instrument(skip_all, fields(order_id = %order.id))]
    pub async fn process(&self, order: Order) -> PaymentProcessed {
        let provider = PROVIDERS[self.rng.pick(PROVIDERS.len())];
        self.latency.simulate(self.rng.as_ref()).await;

        let status =
            StageStatus::from_success(self.rng.succeeds(Stage::Payment, self.success_rate));
        let suffix = random_string(self.rng.as_ref(), TRANSACTION_ALPHABET, 13);
        let transaction_id = format!("tx-{suffix}");

        metrics::counter!(
            "saga_stage_outcomes_total",
            "stage" => "payment",
            "status" => status.as_str()
        )
        .increment(1);
        tracing::info!(
            %provider,
            status = status.as_str(),
            amount = %order.total_amount,
            "payment processed"
        );

        PaymentProcessed {
            order_id: order.id,
            status,
            provider: provider.to_string(),
            transaction_id,
            amount: order.total_amount,
            currency: CURRENCY.to_string(),
            products: order.items,
            customer: Some(order.customer),
        }
    }
}

#[async_trait]
impl SagaService for PaymentProcessor {
    fn name(&self) -> &'static str {
        "payment"
    }

    fn topics(&self) -> &'static [Topic] {
        &[Topic::OrderCreated]
    }

    async fn handle(&self, event: SagaEvent) -> Result<Option<SagaEvent>> {
        match event {
            SagaEvent::OrderCreated(order) => {
                Ok(Some(SagaEvent::PaymentProcessed(self.process(order).await)))
            }
            other => Err(SagaError::UnexpectedEvent {
                service: self.name(),
                topic: other.topic(),
            }),
        }
    }
}
