//! Product stock levels.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use domain::{LineItem, ProductId};

use crate::Randomness;

/// Number of products in the seeded catalog (`prod-0` .. `prod-49`).
pub const CATALOG_SIZE: usize = 50;

/// Stock levels keyed by product.
///
/// Each decrement is a single read-modify-write under the entry lock for
/// that product, so concurrent orders for the same product never lose an
/// update. Different products do not contend. Stock may go negative.
#[derive(Debug, Default)]
pub struct InventoryLedger {
    stock: DashMap<ProductId, i64>,
}

/// Stock level of one product after an order was applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockChange {
    pub product_id: ProductId,
    pub quantity: u32,
    pub remaining: i64,
}

impl InventoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds `prod-0` .. `prod-{size-1}` with 10 to 109 units each.
    pub fn with_catalog(size: usize, rng: &dyn Randomness) -> Self {
        let ledger = Self::new();
        for i in 0..size {
            let units = rng.between(10, 109) as i64;
            ledger.stock.insert(ProductId::new(format!("prod-{i}")), units);
        }
        ledger
    }

    pub fn from_stock(levels: impl IntoIterator<Item = (ProductId, i64)>) -> Self {
        Self {
            stock: levels.into_iter().collect(),
        }
    }

    pub fn stock(&self, product_id: &ProductId) -> Option<i64> {
        self.stock.get(product_id).map(|level| *level)
    }

    pub fn len(&self) -> usize {
        self.stock.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stock.is_empty()
    }

    /// Removes `quantity` units of one product and returns the new level.
    ///
    /// A product not yet in the ledger is first given a random level in
    /// `0..=99`.
    pub fn decrement(&self, product_id: &ProductId, quantity: u32, rng: &dyn Randomness) -> i64 {
        let quantity = i64::from(quantity);
        match self.stock.entry(product_id.clone()) {
            Entry::Occupied(mut entry) => {
                *entry.get_mut() -= quantity;
                *entry.get()
            }
            Entry::Vacant(entry) => {
                let remaining = rng.between(0, 99) as i64 - quantity;
                entry.insert(remaining);
                remaining
            }
        }
    }

    /// Applies every line item of an order.
    pub fn apply(&self, items: &[LineItem], rng: &dyn Randomness) -> Vec<StockChange> {
        items
            .iter()
            .map(|item| {
                let remaining = self.decrement(&item.product_id, item.quantity, rng);
                metrics::gauge!("inventory_stock_level", "product" => item.product_id.to_string())
                    .set(remaining as f64);
                StockChange {
                    product_id: item.product_id.clone(),
                    quantity: item.quantity,
                    remaining,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FastRandom, ScriptedRandomness};
    use domain::Money;

    fn item(id: &str, quantity: u32) -> LineItem {
        LineItem::new(id, "Thing", Money::from_cents(100), quantity).unwrap()
    }

    #[test]
    fn catalog_levels_in_range() {
        let ledger = InventoryLedger::with_catalog(CATALOG_SIZE, &FastRandom::seeded(5));
        assert_eq!(ledger.len(), CATALOG_SIZE);
        for i in 0..CATALOG_SIZE {
            let level = ledger.stock(&ProductId::new(format!("prod-{i}"))).unwrap();
            assert!((10..=109).contains(&level));
        }
    }

    #[test]
    fn apply_decrements_known_products() {
        let ledger = InventoryLedger::from_stock([
            (ProductId::new("prod-1"), 20),
            (ProductId::new("prod-7"), 5),
        ]);
        let rng = ScriptedRandomness::all_succeed();

        let changes = ledger.apply(&[item("prod-1", 2), item("prod-7", 1)], &rng);

        assert_eq!(changes[0].remaining, 18);
        assert_eq!(changes[1].remaining, 4);
        assert_eq!(ledger.stock(&ProductId::new("prod-1")), Some(18));
    }

    #[test]
    fn unknown_product_is_inserted() {
        let ledger = InventoryLedger::new();
        // scripted rng draws the lower bound, 0
        let rng = ScriptedRandomness::all_succeed();
        let remaining = ledger.decrement(&ProductId::new("prod-99"), 3, &rng);
        assert_eq!(remaining, -3);
        assert_eq!(ledger.stock(&ProductId::new("prod-99")), Some(-3));
    }

    #[test]
    fn stock_may_go_negative() {
        let ledger = InventoryLedger::from_stock([(ProductId::new("prod-2"), 1)]);
        let rng = ScriptedRandomness::all_succeed();
        assert_eq!(ledger.decrement(&ProductId::new("prod-2"), 5, &rng), -4);
    }
}
