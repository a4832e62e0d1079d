//! Synthetic order source for the demo pipeline.

use std::sync::Arc;
use std::time::Duration;

use domain::{Address, Customer, CustomerId, LineItem, Money, Order};
use event_bus::EventBus;
use tokio::task::JoinHandle;

use crate::ledger::CATALOG_SIZE;
use crate::{OrderCoordinator, Publisher, Randomness, Result};

const ADJECTIVES: [&str; 8] = [
    "Ergonomic", "Rustic", "Sleek", "Handmade", "Refined", "Practical", "Gorgeous", "Small",
];
const MATERIALS: [&str; 6] = ["Steel", "Wooden", "Cotton", "Granite", "Bronze", "Plastic"];
const PRODUCTS: [&str; 8] = [
    "Chair", "Lamp", "Table", "Mug", "Keyboard", "Shirt", "Bike", "Clock",
];

const FIRST_NAMES: [&str; 8] = [
    "Ada", "Grace", "Alan", "Edsger", "Barbara", "Donald", "Frances", "Ken",
];
const LAST_NAMES: [&str; 8] = [
    "Lovelace", "Hopper", "Turing", "Dijkstra", "Liskov", "Knuth", "Allen", "Thompson",
];
const CITIES: [(&str, &str, &str); 4] = [
    ("Dublin", "Leinster", "Ireland"),
    ("Cork", "Munster", "Ireland"),
    ("Lyon", "Auvergne-Rhone-Alpes", "France"),
    ("Porto", "Norte", "Portugal"),
];
const STREETS: [&str; 4] = ["Main Street", "Harbour Road", "Church Lane", "Station Avenue"];

/// Builds random orders: one to five line items of products `prod-0` ..
/// `prod-49`, each with a quantity of one to five.
pub struct OrderGenerator {
    rng: Arc<dyn Randomness>,
}

impl OrderGenerator {
    pub fn new(rng: Arc<dyn Randomness>) -> Self {
        Self { rng }
    }

    pub fn generate(&self) -> Result<Order> {
        let count = self.rng.between(1, 5);
        let items = (0..count)
            .map(|_| self.line_item())
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Order::create(self.customer(), items)?)
    }

    /// Places a new order every `period` until the task is aborted.
    ///
    /// A failed publish is logged and the next tick tries again.
    pub fn spawn<B>(self, publisher: Publisher<B>, period: Duration) -> JoinHandle<()>
    where
        B: EventBus + 'static,
    {
        tokio::spawn(async move {
            let coordinator = OrderCoordinator::new();
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                let placed = match self.generate() {
                    Ok(order) => coordinator.place_order(&publisher, order).await,
                    Err(e) => Err(e),
                };
                if let Err(e) = placed {
                    tracing::error!(error = %e, "failed to place generated order");
                }
            }
        })
    }

    fn choose<'a>(&self, options: &[&'a str]) -> &'a str {
        options[self.rng.pick(options.len())]
    }

    fn line_item(&self) -> domain::Result<LineItem> {
        let product = self.rng.pick(CATALOG_SIZE);
        let name = format!(
            "{} {} {}",
            self.choose(&ADJECTIVES),
            self.choose(&MATERIALS),
            self.choose(&PRODUCTS)
        );
        let price = Money::from_cents(self.rng.between(100, 100_000) as i64);
        let quantity = self.rng.between(1, 5) as u32;
        LineItem::new(format!("prod-{product}"), name, price, quantity)
    }

    fn customer(&self) -> Customer {
        let first = self.choose(&FIRST_NAMES);
        let last = self.choose(&LAST_NAMES);
        let (city, state, country) = CITIES[self.rng.pick(CITIES.len())];
        let number = self.rng.between(1, 250);
        Customer {
            id: CustomerId::new(),
            name: format!("{first} {last}"),
            email: Some(format!("{}.{}@example.com", first.to_lowercase(), last.to_lowercase())),
            phone: Some(format!("+353 1 {:07}", self.rng.between(0, 9_999_999))),
            address: Some(Address {
                street: format!("{number} {}", self.choose(&STREETS)),
                city: city.to_string(),
                state: state.to_string(),
                zip_code: format!("{:05}", self.rng.between(0, 99_999)),
                country: country.to_string(),
            }),
        }
    }
}
