//! Delivery semantics of the in-memory bus: redelivery, skipping, concurrency.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use event_bus::{
    BusConfig, EventBus, EventBusError, EventEnvelope, InMemoryEventBus, Message, MessageHandler,
    RetryPolicy,
};

/// Fails the first `failures` deliveries of every distinct payload.
struct Flaky {
    failures: usize,
    attempts: Mutex<HashMap<Vec<u8>, usize>>,
    accepted: AtomicUsize,
}

impl Flaky {
    fn new(failures: usize) -> Self {
        Self {
            failures,
            attempts: Mutex::new(HashMap::new()),
            accepted: AtomicUsize::new(0),
        }
    }

    fn attempts_for(&self, payload: &[u8]) -> usize {
        self.attempts
            .lock()
            .unwrap()
            .get(payload)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl MessageHandler for Flaky {
    async fn on_message(&self, message: &Message) -> event_bus::Result<()> {
        let attempt = {
            let mut attempts = self.attempts.lock().unwrap();
            let entry = attempts.entry(message.payload.clone()).or_insert(0);
            *entry += 1;
            *entry
        };
        if attempt <= self.failures {
            return Err(EventBusError::Handler(format!("attempt {attempt} failed")));
        }
        self.accepted.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn bus(max_retries: u32) -> InMemoryEventBus {
    InMemoryEventBus::with_config(
        BusConfig::default()
            .with_partitions(2)
            .with_retry(RetryPolicy::immediate(max_retries)),
    )
    .unwrap()
}

async fn eventually(check: impl Fn() -> bool) {
    for _ in 0..400 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached in time");
}

#[tokio::test]
async fn failed_handler_gets_message_again() {
    let bus = bus(5);
    let handler = Arc::new(Flaky::new(2));
    let _handle = bus
        .subscribe("flaky", &["orders"])
        .await
        .unwrap()
        .run(Arc::clone(&handler));

    bus.publish("orders", "k", b"m1".to_vec()).await.unwrap();

    eventually(|| handler.accepted.load(Ordering::SeqCst) == 1).await;
    assert_eq!(handler.attempts_for(b"m1"), 3);
}

#[tokio::test]
async fn exhausted_message_is_skipped_and_next_is_processed() {
    let bus = bus(1);
    let handler = Arc::new(Flaky::new(usize::MAX));
    let _handle = bus
        .subscribe("hopeless", &["orders"])
        .await
        .unwrap()
        .run(Arc::clone(&handler));

    bus.publish("orders", "same", b"first".to_vec()).await.unwrap();
    bus.publish("orders", "same", b"second".to_vec()).await.unwrap();

    eventually(|| handler.attempts_for(b"second") == 2).await;
    assert_eq!(handler.attempts_for(b"first"), 2);
    assert_eq!(handler.accepted.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn published_envelopes_decode_on_the_consumer_side() {
    #[derive(serde::Serialize, serde::Deserialize, Debug, PartialEq)]
    struct Greeting {
        text: String,
    }

    struct Decoder {
        decoded: Mutex<Vec<EventEnvelope<Greeting>>>,
    }

    #[async_trait]
    impl MessageHandler for Decoder {
        async fn on_message(&self, message: &Message) -> event_bus::Result<()> {
            let envelope = EventEnvelope::<Greeting>::decode(&message.payload)?;
            self.decoded.lock().unwrap().push(envelope);
            Ok(())
        }
    }

    let bus = bus(0);
    let handler = Arc::new(Decoder {
        decoded: Mutex::new(Vec::new()),
    });
    let _handle = bus
        .subscribe("decoder", &["greetings"])
        .await
        .unwrap()
        .run(Arc::clone(&handler));

    let envelope = EventEnvelope::new(Greeting {
        text: "hello".to_string(),
    });
    bus.publish("greetings", &envelope.event_id.to_string(), envelope.encode().unwrap())
        .await
        .unwrap();

    eventually(|| handler.decoded.lock().unwrap().len() == 1).await;
    assert_eq!(handler.decoded.lock().unwrap()[0], envelope);
}

#[tokio::test]
async fn shutdown_stops_delivery() {
    let bus = bus(0);
    let handler = Arc::new(Flaky::new(0));
    let handle = bus
        .subscribe("stoppable", &["orders"])
        .await
        .unwrap()
        .run(Arc::clone(&handler));
    assert_eq!(handle.active_tasks(), 2);

    handle.shutdown().await;
    bus.publish("orders", "k", b"ignored".to_vec()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(30)).await;

    assert_eq!(handler.accepted.load(Ordering::SeqCst), 0);
}
