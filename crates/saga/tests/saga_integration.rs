//! End-to-end tests for the choreographed fulfillment saga.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use domain::{
    Customer, LineItem, Money, NotificationType, Order, OrderLifecycle, OrderStatus, ProductId,
    SagaEvent, Topic,
};
use event_bus::{
    BusConfig, EventBus, EventBusError, InMemoryEventBus, MessagePosition, RetryPolicy,
    Subscription,
};
use saga::{
    FastRandom, InventoryLedger, InventoryManager, Latency, OrderCoordinator, PartitionKey,
    PaymentProcessor, PipelineOptions, Publisher, SagaPipeline, SagaService, ScriptedRandomness,
    ShipmentPreparer, Stage, start_service,
};

/// Rejects the first `failures` publishes to one topic, then passes through.
#[derive(Clone)]
struct FlakyBus {
    inner: InMemoryEventBus,
    topic: &'static str,
    failures: Arc<AtomicUsize>,
}

#[async_trait]
impl EventBus for FlakyBus {
    async fn publish(
        &self,
        topic: &str,
        key: &str,
        payload: Vec<u8>,
    ) -> event_bus::Result<MessagePosition> {
        if topic == self.topic
            && self
                .failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
        {
            return Err(EventBusError::Connection("broker unavailable".to_string()));
        }
        self.inner.publish(topic, key, payload).await
    }

    async fn subscribe(&self, group: &str, topics: &[&str]) -> event_bus::Result<Subscription> {
        self.inner.subscribe(group, topics).await
    }
}

fn bus() -> InMemoryEventBus {
    let config = BusConfig::default().with_retry(RetryPolicy::immediate(3));
    InMemoryEventBus::with_config(config).unwrap()
}

fn ledger() -> Arc<InventoryLedger> {
    Arc::new(InventoryLedger::from_stock([
        (ProductId::new("prod-1"), 20),
        (ProductId::new("prod-7"), 5),
    ]))
}

fn order() -> Order {
    Order::create(
        Customer::named("Ada"),
        vec![
            LineItem::new("prod-1", "Lamp", Money::from_cents(1250), 2).unwrap(),
            LineItem::new("prod-7", "Mug", Money::from_cents(800), 1).unwrap(),
        ],
    )
    .unwrap()
}

async fn start(
    bus: &InMemoryEventBus,
    rng: ScriptedRandomness,
    ledger: Arc<InventoryLedger>,
) -> SagaPipeline {
    let options = PipelineOptions::default()
        .without_latency()
        .with_ledger(ledger);
    SagaPipeline::start(bus, Arc::new(rng), options).await.unwrap()
}

async fn place(bus: &InMemoryEventBus, order: Order) {
    let publisher = Publisher::new(bus.clone(), PartitionKey::EventId);
    OrderCoordinator::new()
        .place_order(&publisher, order)
        .await
        .unwrap();
}

async fn wait_for_count(bus: &InMemoryEventBus, topic: Topic, count: usize) {
    for _ in 0..400 {
        if bus.message_count(topic.as_str()).await >= count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("timed out waiting for {count} messages on {topic}");
}

async fn events(bus: &InMemoryEventBus, topic: Topic) -> Vec<SagaEvent> {
    bus.messages(topic.as_str())
        .await
        .iter()
        .map(|m| SagaEvent::from_message(m).unwrap().payload)
        .collect()
}

async fn all_events(bus: &InMemoryEventBus) -> Vec<SagaEvent> {
    let mut all = Vec::new();
    for topic in Topic::ALL {
        all.extend(events(bus, topic).await);
    }
    all
}

#[tokio::test]
async fn happy_path_completes_once_and_decrements_stock() {
    let bus = bus();
    let pipeline = start(&bus, ScriptedRandomness::all_succeed(), ledger()).await;

    let order = order();
    let order_id = order.id;
    place(&bus, order).await;

    // payment confirmation, shipping confirmation, order completed
    wait_for_count(&bus, Topic::NotificationSent, 3).await;
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert_eq!(bus.message_count("order-completed").await, 1);
    assert_eq!(bus.message_count("order-failed").await, 0);

    let kinds: Vec<NotificationType> = events(&bus, Topic::NotificationSent)
        .await
        .into_iter()
        .filter_map(|e| match e {
            SagaEvent::NotificationSent(n) => Some(n.notification_type),
            _ => None,
        })
        .collect();
    assert!(kinds.contains(&NotificationType::PaymentConfirmation));
    assert!(kinds.contains(&NotificationType::ShippingConfirmation));
    assert!(kinds.contains(&NotificationType::OrderCompleted));

    let ledger = pipeline.ledger();
    assert_eq!(ledger.stock(&ProductId::new("prod-1")), Some(18));
    assert_eq!(ledger.stock(&ProductId::new("prod-7")), Some(4));

    let lifecycle = OrderLifecycle::fold(order_id, &all_events(&bus).await);
    assert_eq!(lifecycle.status(), Some(OrderStatus::Completed));
    assert_eq!(lifecycle.completions(), 1);

    pipeline.shutdown().await;
}

#[tokio::test]
async fn failed_payment_fails_order_without_further_stages() {
    let bus = bus();
    let ledger = ledger();
    let rng = ScriptedRandomness::all_succeed().failing(Stage::Payment);
    let pipeline = start(&bus, rng, Arc::clone(&ledger)).await;

    place(&bus, order()).await;

    // the only notification is the order-failed one
    wait_for_count(&bus, Topic::NotificationSent, 1).await;
    tokio::time::sleep(Duration::from_millis(20)).await;

    let failed = events(&bus, Topic::OrderFailed).await;
    assert_eq!(failed.len(), 1);
    match &failed[0] {
        SagaEvent::OrderFailed(f) => assert_eq!(f.reason, "Payment failed"),
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(bus.message_count("inventory-updated").await, 0);
    assert_eq!(bus.message_count("shipping-prepared").await, 0);
    assert_eq!(bus.message_count("order-completed").await, 0);
    assert_eq!(bus.message_count("notification-sent").await, 1);
    assert_eq!(ledger.stock(&ProductId::new("prod-1")), Some(20));

    pipeline.shutdown().await;
}

#[tokio::test]
async fn failed_inventory_fails_order_and_keeps_stock() {
    let bus = bus();
    let ledger = ledger();
    let rng = ScriptedRandomness::all_succeed().failing(Stage::Inventory);
    let pipeline = start(&bus, rng, Arc::clone(&ledger)).await;

    let order = order();
    let order_id = order.id;
    place(&bus, order).await;

    // payment confirmation, then order failed
    wait_for_count(&bus, Topic::NotificationSent, 2).await;
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert_eq!(bus.message_count("shipping-prepared").await, 0);
    assert_eq!(ledger.stock(&ProductId::new("prod-7")), Some(5));

    let lifecycle = OrderLifecycle::fold(order_id, &all_events(&bus).await);
    assert_eq!(lifecycle.status(), Some(OrderStatus::Failed));
    assert_eq!(lifecycle.failure_reason(), Some("Inventory update failed"));

    pipeline.shutdown().await;
}

#[tokio::test]
async fn malformed_order_is_skipped_and_next_is_processed() {
    let bus = bus();
    let pipeline = start(&bus, ScriptedRandomness::all_succeed(), ledger()).await;

    bus.publish("order-created", "garbage", b"{\"id\": 42".to_vec())
        .await
        .unwrap();
    place(&bus, order()).await;

    wait_for_count(&bus, Topic::OrderCompleted, 1).await;
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(bus.message_count("payment-processed").await, 1);

    pipeline.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_decrements_lose_no_updates() {
    let ledger = Arc::new(InventoryLedger::from_stock([(ProductId::new("prod-3"), 10_000)]));
    let rng = Arc::new(ScriptedRandomness::all_succeed());

    let mut tasks = Vec::new();
    for _ in 0..50 {
        let ledger = Arc::clone(&ledger);
        let rng = Arc::clone(&rng);
        tasks.push(tokio::spawn(async move {
            for _ in 0..20 {
                ledger.decrement(&ProductId::new("prod-3"), 3, rng.as_ref());
                tokio::task::yield_now().await;
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(ledger.stock(&ProductId::new("prod-3")), Some(10_000 - 50 * 20 * 3));
}

#[tokio::test]
async fn completion_rate_converges_to_product_of_stage_rates() {
    let rng = Arc::new(FastRandom::seeded(2024));
    let payment = PaymentProcessor::new(rng.clone()).with_latency(Latency::NONE);
    let inventory = InventoryManager::new(rng.clone()).with_latency(Latency::NONE);
    let shipping = ShipmentPreparer::new(rng.clone()).with_latency(Latency::NONE);
    let coordinator = OrderCoordinator::new();

    let runs = 5_000;
    let mut completed = 0;
    for _ in 0..runs {
        let mut next = Some(SagaEvent::OrderCreated(order()));
        while let Some(event) = next.take() {
            let reply = match event.topic() {
                Topic::OrderCreated => payment.handle(event).await.unwrap(),
                Topic::PaymentProcessed | Topic::InventoryUpdated | Topic::ShippingPrepared => {
                    let terminal = coordinator.handle(event.clone()).await.unwrap();
                    if terminal.is_some() {
                        terminal
                    } else if event.topic() == Topic::PaymentProcessed {
                        inventory.handle(event).await.unwrap()
                    } else {
                        shipping.handle(event).await.unwrap()
                    }
                }
                _ => None,
            };
            if let Some(SagaEvent::OrderCompleted(_)) = &reply {
                completed += 1;
            }
            next = reply;
        }
    }

    let rate = completed as f64 / runs as f64;
    assert!((rate - 0.684).abs() < 0.03, "completion rate {rate}");
}

#[tokio::test]
async fn redelivered_shipment_can_complete_twice() {
    let rng = Arc::new(ScriptedRandomness::all_succeed());
    let payment = PaymentProcessor::new(rng.clone()).with_latency(Latency::NONE);
    let inventory =
        InventoryManager::with_ledger(ledger(), rng.clone()).with_latency(Latency::NONE);
    let shipping = ShipmentPreparer::new(rng).with_latency(Latency::NONE);
    let coordinator = OrderCoordinator::new();

    let order = order();
    let order_id = order.id;
    let paid = payment.handle(SagaEvent::OrderCreated(order)).await.unwrap().unwrap();
    let reserved = inventory.handle(paid).await.unwrap().unwrap();
    let shipped = shipping.handle(reserved).await.unwrap().unwrap();

    // the same shipping event delivered twice yields two terminal events
    let first = coordinator.handle(shipped.clone()).await.unwrap().unwrap();
    let second = coordinator.handle(shipped).await.unwrap().unwrap();

    let lifecycle = OrderLifecycle::fold(order_id, [&first, &second]);
    assert_eq!(lifecycle.completions(), 2);
    assert_eq!(lifecycle.status(), Some(OrderStatus::Completed));
}

#[tokio::test]
async fn failed_reply_publish_does_not_reapply_stock() {
    let inner = bus();
    let flaky = FlakyBus {
        inner: inner.clone(),
        topic: "inventory-updated",
        failures: Arc::new(AtomicUsize::new(1)),
    };
    let rng = Arc::new(ScriptedRandomness::all_succeed());
    let ledger = ledger();
    let inventory = InventoryManager::with_ledger(Arc::clone(&ledger), rng.clone())
        .with_latency(Latency::NONE);
    let _handle = start_service(&flaky, Arc::new(inventory), PartitionKey::OrderId)
        .await
        .unwrap();

    let payment = PaymentProcessor::new(rng).with_latency(Latency::NONE);
    let paid = payment
        .handle(SagaEvent::OrderCreated(order()))
        .await
        .unwrap()
        .unwrap();
    Publisher::new(inner.clone(), PartitionKey::OrderId)
        .publish(&paid)
        .await
        .unwrap();

    wait_for_count(&inner, Topic::InventoryUpdated, 1).await;
    tokio::time::sleep(Duration::from_millis(30)).await;

    assert_eq!(inner.message_count("inventory-updated").await, 1);
    assert_eq!(ledger.stock(&ProductId::new("prod-1")), Some(18));
    assert_eq!(ledger.stock(&ProductId::new("prod-7")), Some(4));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn every_order_reaches_exactly_one_terminal_event() {
    let bus = bus();
    let options = PipelineOptions::default().without_latency();
    let pipeline = SagaPipeline::start(&bus, Arc::new(FastRandom::seeded(7)), options)
        .await
        .unwrap();

    let mut order_ids = Vec::new();
    for _ in 0..50 {
        let order = order();
        order_ids.push(order.id);
        place(&bus, order).await;
    }

    for _ in 0..1_000 {
        let terminal =
            bus.message_count("order-completed").await + bus.message_count("order-failed").await;
        if terminal >= order_ids.len() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    tokio::time::sleep(Duration::from_millis(30)).await;

    let events = all_events(&bus).await;
    for order_id in order_ids {
        let lifecycle = OrderLifecycle::fold(order_id, &events);
        assert_eq!(
            lifecycle.completions() + lifecycle.failures(),
            1,
            "order {order_id} ended with {:?}",
            lifecycle.status()
        );
    }

    pipeline.shutdown().await;
}
