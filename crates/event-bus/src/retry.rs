//! Redelivery policy for messages whose handler returned an error.

use std::time::Duration;

use crate::{Message, MessageHandler};

/// Bounded exponential backoff applied to failed deliveries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Redeliveries attempted after the first failure (0 = deliver once).
    pub max_retries: u32,
    /// Delay before the first redelivery.
    pub initial_backoff: Duration,
    /// Upper bound on any single delay.
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 10,
            initial_backoff: Duration::from_millis(300),
            max_backoff: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// A policy with no waiting between attempts, for tests.
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
        }
    }

    /// Returns the delay before redelivery number `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

/// What happened to a message after all delivery attempts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The handler accepted the message.
    Delivered { attempts: u32 },
    /// Every attempt failed; the message is skipped.
    Exhausted { attempts: u32, error: String },
}

/// Hands `message` to `handler`, redelivering on error per `policy`.
pub(crate) async fn deliver<H: MessageHandler + ?Sized>(
    handler: &H,
    message: &Message,
    policy: &RetryPolicy,
    group: &str,
) -> DeliveryOutcome {
    let mut attempts = 0;
    loop {
        attempts += 1;
        match handler.on_message(message).await {
            Ok(()) => return DeliveryOutcome::Delivered { attempts },
            Err(e) if attempts > policy.max_retries => {
                tracing::error!(
                    group,
                    topic = %message.topic,
                    partition = message.partition,
                    offset = message.offset,
                    attempts,
                    error = %e,
                    "delivery retries exhausted, skipping message"
                );
                metrics::counter!(
                    "bus_deliveries_exhausted_total",
                    "topic" => message.topic.clone()
                )
                .increment(1);
                return DeliveryOutcome::Exhausted {
                    attempts,
                    error: e.to_string(),
                };
            }
            Err(e) => {
                let delay = policy.backoff(attempts);
                tracing::warn!(
                    group,
                    topic = %message.topic,
                    offset = message.offset,
                    attempt = attempts,
                    ?delay,
                    error = %e,
                    "handler failed, redelivering"
                );
                metrics::counter!("bus_delivery_retries_total", "topic" => message.topic.clone())
                    .increment(1);
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;
    use chrono::Utc;

    use super::*;
    use crate::EventBusError;

    struct FailTimes {
        remaining: AtomicU32,
        calls: AtomicU32,
    }

    #[async_trait]
    impl MessageHandler for FailTimes {
        async fn on_message(&self, _message: &Message) -> crate::Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let left = self.remaining.load(Ordering::SeqCst);
            if left > 0 {
                self.remaining.store(left - 1, Ordering::SeqCst);
                return Err(EventBusError::Handler("boom".to_string()));
            }
            Ok(())
        }
    }

    fn message() -> Message {
        Message {
            topic: "t".to_string(),
            partition: 0,
            offset: 0,
            key: "k".to_string(),
            payload: b"{}".to_vec(),
            published_at: Utc::now(),
        }
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            max_retries: 10,
            initial_backoff: Duration::from_millis(300),
            max_backoff: Duration::from_secs(1),
        };
        assert_eq!(policy.backoff(1), Duration::from_millis(300));
        assert_eq!(policy.backoff(2), Duration::from_millis(600));
        assert_eq!(policy.backoff(3), Duration::from_secs(1));
        assert_eq!(policy.backoff(40), Duration::from_secs(1));
    }

    #[tokio::test]
    async fn redelivers_until_handler_succeeds() {
        let handler = FailTimes {
            remaining: AtomicU32::new(2),
            calls: AtomicU32::new(0),
        };
        let outcome = deliver(&handler, &message(), &RetryPolicy::immediate(5), "g").await;
        assert_eq!(outcome, DeliveryOutcome::Delivered { attempts: 3 });
        assert_eq!(handler.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let handler = FailTimes {
            remaining: AtomicU32::new(100),
            calls: AtomicU32::new(0),
        };
        let outcome = deliver(&handler, &message(), &RetryPolicy::immediate(2), "g").await;
        assert!(matches!(outcome, DeliveryOutcome::Exhausted { attempts: 3, .. }));
        assert_eq!(handler.calls.load(Ordering::SeqCst), 3);
    }
}
