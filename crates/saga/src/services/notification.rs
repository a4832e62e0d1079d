//! Customer notifications.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use domain::{
    Channel, Customer, DeliveryStatus, NotificationSent, NotificationType, OrderId, SagaEvent,
    Topic,
};

use crate::{Latency, Randomness, Result, SagaError, SagaService, Stage};

pub const SUCCESS_RATE: f64 = 0.98;
pub const LATENCY: Latency = Latency::millis(300, 1000);
/// Recipient used when the event carries no customer email.
pub const FALLBACK_RECIPIENT: &str = "unknown@example.com";

const CHANNELS: [Channel; 2] = [Channel::Email, Channel::Sms];

/// What a notification is about, before it is sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationRequest {
    pub order_id: OrderId,
    pub notification_type: NotificationType,
    pub recipient: String,
    pub tracking_number: Option<String>,
    pub carrier: Option<String>,
    pub reason: Option<String>,
}

impl NotificationRequest {
    fn new(
        order_id: OrderId,
        notification_type: NotificationType,
        customer: Option<&Customer>,
    ) -> Self {
        let recipient = customer
            .and_then(|c| c.email.clone())
            .unwrap_or_else(|| FALLBACK_RECIPIENT.to_string());
        Self {
            order_id,
            notification_type,
            recipient,
            tracking_number: None,
            carrier: None,
            reason: None,
        }
    }

    /// Maps an incoming event to the notification it warrants, if any.
    ///
    /// Failed payments and failed shipments do not notify on their own; the
    /// terminal `order-failed` event does.
    pub fn for_event(event: &SagaEvent) -> Option<Self> {
        match event {
            SagaEvent::PaymentProcessed(p) if p.status.is_success() => Some(Self::new(
                p.order_id,
                NotificationType::PaymentConfirmation,
                p.customer.as_ref(),
            )),
            SagaEvent::ShippingPrepared(s) if s.status.is_success() => {
                let mut request = Self::new(
                    s.order_id,
                    NotificationType::ShippingConfirmation,
                    s.customer.as_ref(),
                );
                request.tracking_number = s.tracking_number.clone();
                request.carrier = s.carrier.clone();
                Some(request)
            }
            SagaEvent::OrderCompleted(c) => Some(Self::new(
                c.order_id,
                NotificationType::OrderCompleted,
                None,
            )),
            SagaEvent::OrderFailed(f) => {
                let mut request = Self::new(f.order_id, NotificationType::OrderFailed, None);
                request.reason = Some(f.reason.clone());
                Some(request)
            }
            _ => None,
        }
    }
}

/// Sends notifications on a random channel.
pub struct NotificationDispatcher {
    rng: Arc<dyn Randomness>,
    latency: Latency,
    success_rate: f64,
}

impl NotificationDispatcher {
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

    #[tracing::instrument(
        skip_all,
        fields(order_id = %request.order_id, kind = request.notification_type.as_str())
    )]
    pub async fn send(&self, request: NotificationRequest) -> NotificationSent {
        let channel = CHANNELS[self.rng.pick(CHANNELS.len())];
        self.latency.simulate(self.rng.as_ref()).await;

        let status = if self.rng.succeeds(Stage::Notification, self.success_rate) {
            DeliveryStatus::Sent
        } else {
            DeliveryStatus::Failed
        };
        metrics::counter!("saga_notifications_total", "status" => status.as_str()).increment(1);
        tracing::info!(
            recipient = %request.recipient,
            ?channel,
            status = status.as_str(),
            "notification dispatched"
        );

        NotificationSent {
            order_id: request.order_id,
            notification_type: request.notification_type,
            recipient: request.recipient,
            channel,
            status,
            sent_at: Utc::now(),
            tracking_number: request.tracking_number,
            carrier: request.carrier,
            reason: request.reason,
        }
    }
}

#[async_trait]
impl SagaService for NotificationDispatcher {
    fn name(&self) -> &'static str {
        "notification"
    }

    fn topics(&self) -> &'static [Topic] {
        &[
            Topic::PaymentProcessed,
            Topic::ShippingPrepared,
            Topic::OrderCompleted,
            Topic::OrderFailed,
        ]
    }

    async fn handle(&self, event: SagaEvent) -> Result<Option<SagaEvent>> {
        if !self.topics().contains(&event.topic()) {
            return Err(SagaError::UnexpectedEvent {
                service: self.name(),
                topic: event.topic(),
            });
        }
        match NotificationRequest::for_event(&event) {
            Some(request) => Ok(Some(SagaEvent::NotificationSent(self.send(request).await))),
            None => Ok(None),
        }
    }
}
