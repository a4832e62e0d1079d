//! Analytics over a live bus.

use std::time::Duration;

use analytics::{AnalyticsAggregator, spawn_reporter};
use domain::{
    Customer, LineItem, Money, Order, OrderCompleted, OrderFailed, PaymentProcessed, SagaEvent,
    StageStatus,
};
use event_bus::{EventBus, InMemoryEventBus};

fn order(products: &[(&str, u32)]) -> Order {
    let items = products
        .iter()
        .map(|(id, qty)| LineItem::new(*id, "Thing", Money::from_cents(1000), *qty).unwrap())
        .collect();
    Order::create(Customer::named("Ada"), items).unwrap()
}

fn paid(order: &Order) -> SagaEvent {
    SagaEvent::PaymentProcessed(PaymentProcessed {
        order_id: order.id,
        status: StageStatus::Success,
        provider: "Visa".to_string(),
        transaction_id: "tx-1".to_string(),
        amount: order.total_amount,
        currency: "EUR".to_string(),
        products: order.items.clone(),
        customer: Some(order.customer.clone()),
    })
}

async fn publish(bus: &InMemoryEventBus, event: &SagaEvent) {
    let (envelope, bytes) = event.encode().unwrap();
    bus.publish(event.topic().as_str(), &envelope.event_id.to_string(), bytes)
        .await
        .unwrap();
}

async fn wait_for_events(aggregator: &AnalyticsAggregator, count: u64) {
    for _ in 0..400 {
        if aggregator.snapshot().await.events_processed >= count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("aggregator saw fewer than {count} events");
}

#[tokio::test]
async fn aggregates_events_from_every_topic() {
    let bus = InMemoryEventBus::new();
    let aggregator = AnalyticsAggregator::default();
    let handle = aggregator.subscribe(&bus).await.unwrap();

    let first = order(&[("prod-1", 2), ("prod-7", 1)]);
    let second = order(&[("prod-7", 3)]);

    // terminal events first so the ratios are defined when payments land
    for event in [
        SagaEvent::OrderCreated(first.clone()),
        SagaEvent::OrderCreated(second.clone()),
        SagaEvent::OrderCompleted(OrderCompleted::now(first.id)),
        SagaEvent::OrderFailed(OrderFailed::new(second.id, "Inventory update failed")),
    ] {
        publish(&bus, &event).await;
    }
    wait_for_events(&aggregator, 4).await;

    publish(&bus, &paid(&first)).await;
    publish(&bus, &paid(&second)).await;
    bus.publish("payment-processed", "junk", b"not json".to_vec())
        .await
        .unwrap();
    wait_for_events(&aggregator, 6).await;

    let snapshot = aggregator.snapshot().await;
    assert_eq!(snapshot.total_orders, 2);
    assert_eq!(snapshot.successful_orders, 1);
    assert_eq!(snapshot.failed_orders, 1);
    assert_eq!(snapshot.total_revenue, Money::from_cents(3000 + 3000));
    assert_eq!(snapshot.average_order_value, Money::from_cents(6000));
    assert_eq!(snapshot.payment_success_rate, 0.5);
    assert_eq!(snapshot.top_products[0].product_id.as_str(), "prod-7");
    assert_eq!(snapshot.top_products[0].count, 2);
    assert_eq!(snapshot.top_products[1].product_id.as_str(), "prod-1");

    handle.shutdown().await;
}

#[tokio::test]
async fn snapshot_serializes_camel_case() {
    let aggregator = AnalyticsAggregator::default();
    aggregator
        .record(&SagaEvent::OrderCreated(order(&[("prod-3", 1)])))
        .await;

    let json = serde_json::to_value(aggregator.snapshot().await).unwrap();
    assert_eq!(json["totalOrders"], 1);
    assert_eq!(json["paymentSuccessRate"], 0.0);
    assert_eq!(json["averageOrderValue"], 0.0);
    assert!(json["topProducts"].as_array().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn reporter_runs_until_aborted() {
    let aggregator = AnalyticsAggregator::default();
    let reporter = spawn_reporter(aggregator, Duration::from_secs(30));

    tokio::time::sleep(Duration::from_secs(95)).await;
    assert!(!reporter.is_finished());

    reporter.abort();
    assert!(reporter.await.unwrap_err().is_cancelled());
}
