//! Product popularity ranking.

use std::collections::HashMap;

use domain::ProductId;
use serde::Serialize;

/// Number of products shown in a report.
pub const TOP_PRODUCTS: usize = 5;

/// A product and how many line items referenced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductCount {
    pub product_id: ProductId,
    pub count: u64,
}

#[derive(Debug, Clone, Copy)]
struct Tally {
    count: u64,
    first_seen: u64,
}

/// Appearance counts per product, ranked on demand.
///
/// Ranking is by count descending; equal counts keep first-seen order.
#[derive(Debug, Default, Clone)]
pub struct ProductPopularity {
    tallies: HashMap<ProductId, Tally>,
    next_seen: u64,
}

impl ProductPopularity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one appearance of `product_id`.
    pub fn record(&mut self, product_id: &ProductId) {
        if let Some(tally) = self.tallies.get_mut(product_id) {
            tally.count += 1;
            return;
        }
        self.tallies.insert(
            product_id.clone(),
            Tally {
                count: 1,
                first_seen: self.next_seen,
            },
        );
        self.next_seen += 1;
    }

    pub fn count(&self, product_id: &ProductId) -> u64 {
        self.tallies.get(product_id).map_or(0, |t| t.count)
    }

    /// Distinct products seen.
    pub fn len(&self) -> usize {
        self.tallies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tallies.is_empty()
    }

    /// The `k` most referenced products.
    pub fn top(&self, k: usize) -> Vec<ProductCount> {
        let mut ranked: Vec<(&ProductId, &Tally)> = self.tallies.iter().collect();
        ranked.sort_by_key(|(_, tally)| tally.first_seen);
        // stable: ties keep first-seen order from the previous sort
        ranked.sort_by(|a, b| b.1.count.cmp(&a.1.count));
        ranked
            .into_iter()
            .take(k)
            .map(|(product_id, tally)| ProductCount {
                product_id: product_id.clone(),
                count: tally.count,
            })
            .collect()
    }
}
