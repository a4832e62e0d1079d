//! Glue between saga services and the event bus.

use std::sync::Arc;

use async_trait::async_trait;
use domain::{SagaEvent, Topic};
use event_bus::{EventBus, Message, MessageHandler, RetryPolicy, SubscriptionHandle};

use crate::{PartitionKey, Publisher, Result, SagaError};

/// A saga participant: consumes some topics and optionally answers with a
/// new event.
#[async_trait]
pub trait SagaService: Send + Sync + 'static {
    /// Short service name, used for the consumer group and in logs.
    fn name(&self) -> &'static str;

    /// Topics this service consumes.
    fn topics(&self) -> &'static [Topic];

    /// Reacts to one event. `Ok(None)` means there is nothing to publish.
    async fn handle(&self, event: SagaEvent) -> Result<Option<SagaEvent>>;
}

/// Consumer group name for a service.
pub fn consumer_group(service: &str) -> String {
    format!("{service}-group")
}

/// Adapts a [`SagaService`] to the bus delivery callback.
///
/// Undecodable messages and service errors are logged and dropped so that
/// one bad message never stalls its partition. The message is always
/// acknowledged once `handle` has run: a failed reply publish is retried
/// here with the same reply, never by redelivering the input.
pub struct ServiceHandler<S, B> {
    service: Arc<S>,
    publisher: Publisher<B>,
    retry: RetryPolicy,
}

impl<S, B> ServiceHandler<S, B>
where
    S: SagaService,
    B: EventBus + 'static,
{
    pub fn new(service: Arc<S>, publisher: Publisher<B>, retry: RetryPolicy) -> Self {
        Self {
            service,
            publisher,
            retry,
        }
    }

    /// Publishes an already computed reply, backing off between attempts.
    async fn publish_reply(&self, event: &SagaEvent) {
        let service = self.service.name();
        let mut attempts = 0;
        loop {
            attempts += 1;
            match self.publisher.publish(event).await {
                Ok(_) => return,
                Err(SagaError::EventBus(e)) if attempts <= self.retry.max_retries => {
                    let delay = self.retry.backoff(attempts);
                    tracing::warn!(
                        attempt = attempts,
                        ?delay,
                        error = %e,
                        "reply publish failed, retrying"
                    );
                    metrics::counter!("saga_publish_retries_total", "service" => service)
                        .increment(1);
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    tracing::error!(
                        attempts,
                        topic = %event.topic(),
                        order_id = %event.order_id(),
                        error = %e,
                        "dropping reply after failed publish"
                    );
                    metrics::counter!("saga_publish_failures_total", "service" => service)
                        .increment(1);
                    return;
                }
            }
        }
    }
}

#[async_trait]
impl<S, B> MessageHandler for ServiceHandler<S, B>
where
    S: SagaService,
    B: EventBus + 'static,
{
    #[tracing::instrument(
        skip(self, message),
        fields(service = self.service.name(), topic = %message.topic, offset = message.offset)
    )]
    async fn on_message(&self, message: &Message) -> event_bus::Result<()> {
        let service = self.service.name();
        metrics::counter!("saga_messages_received_total", "service" => service).increment(1);

        let envelope = match SagaEvent::from_message(message) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::error!(error = %e, "dropping malformed message");
                metrics::counter!("saga_malformed_messages_total", "service" => service)
                    .increment(1);
                return Ok(());
            }
        };
        tracing::debug!(
            event_id = %envelope.event_id,
            order_id = %envelope.payload.order_id(),
            "event received"
        );

        let reply = match self.service.handle(envelope.payload).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::error!(error = %e, "service rejected event");
                metrics::counter!("saga_handler_errors_total", "service" => service).increment(1);
                return Ok(());
            }
        };

        if let Some(event) = reply {
            self.publish_reply(&event).await;
        }
        Ok(())
    }
}

/// Subscribes `service` to its topics and starts delivering to it.
///
/// Replies are published on the same bus.
pub async fn start_service<S, B>(
    bus: &B,
    service: Arc<S>,
    key: PartitionKey,
) -> Result<SubscriptionHandle>
where
    S: SagaService,
    B: EventBus + Clone + 'static,
{
    let group = consumer_group(service.name());
    let topics = Topic::names(service.topics());
    let subscription = bus.subscribe(&group, &topics).await?;
    tracing::info!(%group, ?topics, "service subscribed");

    let retry = subscription.retry_policy().clone();
    let handler = ServiceHandler::new(service, Publisher::new(bus.clone(), key), retry);
    Ok(subscription.run(Arc::new(handler)))
}
