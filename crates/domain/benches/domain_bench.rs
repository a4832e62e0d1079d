use criterion::{Criterion, criterion_group, criterion_main};
use domain::{
    Customer, LineItem, Money, Order, OrderCompleted, OrderLifecycle, PaymentProcessed, SagaEvent,
    StageStatus,
};

fn sample_order(items: usize) -> Order {
    let items = (0..items)
        .map(|i| {
            LineItem::new(format!("prod-{i}"), "Widget", Money::from_cents(1999), 2).unwrap()
        })
        .collect();
    Order::create(Customer::named("Bench"), items).unwrap()
}

fn bench_decode_order_created(c: &mut Criterion) {
    let (_, bytes) = SagaEvent::OrderCreated(sample_order(5)).encode().unwrap();

    c.bench_function("domain/decode_order_created_5_items", |b| {
        b.iter(|| SagaEvent::decode(domain::Topic::OrderCreated, &bytes).unwrap());
    });
}

fn bench_fold_1000_orders(c: &mut Criterion) {
    let orders: Vec<Order> = (0..1000).map(|_| sample_order(3)).collect();
    let events: Vec<SagaEvent> = orders
        .iter()
        .flat_map(|order| {
            [
                SagaEvent::OrderCreated(order.clone()),
                SagaEvent::PaymentProcessed(PaymentProcessed {
                    order_id: order.id,
                    status: StageStatus::Success,
                    provider: "Stripe".to_string(),
                    transaction_id: "tx-bench".to_string(),
                    amount: order.total_amount,
                    currency: "EUR".to_string(),
                    products: order.items.clone(),
                    customer: None,
                }),
                SagaEvent::OrderCompleted(OrderCompleted::now(order.id)),
            ]
        })
        .collect();
    let target = orders[500].id;

    c.bench_function("domain/fold_one_order_from_3000_events", |b| {
        b.iter(|| OrderLifecycle::fold(target, &events));
    });
}

criterion_group!(benches, bench_decode_order_created, bench_fold_1000_orders);
criterion_main!(benches);
