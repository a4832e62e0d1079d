use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Money, ProductId};
use crate::{CustomerId, DomainError, OrderId, OrderStatus, Result};

/// Postal address used for shipping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub country: String,
}

/// The customer placing an order. Contact details are optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
}

impl Customer {
    /// A customer with only a name, for tests and fallbacks.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            id: CustomerId::new(),
            name: name.into(),
            email: None,
            phone: None,
            address: None,
        }
    }
}

/// A product line within an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    #[serde(rename = "id")]
    pub product_id: ProductId,
    pub name: String,
    /// Unit price.
    pub price: Money,
    pub quantity: u32,
}

impl LineItem {
    /// Creates a line item, rejecting zero quantities and negative prices.
    pub fn new(
        product_id: impl Into<ProductId>,
        name: impl Into<String>,
        price: Money,
        quantity: u32,
    ) -> Result<Self> {
        let product_id = product_id.into();
        if quantity == 0 {
            return Err(DomainError::InvalidLineItem {
                product_id: product_id.to_string(),
                reason: "quantity must be positive".to_string(),
            });
        }
        if price.is_negative() {
            return Err(DomainError::InvalidLineItem {
                product_id: product_id.to_string(),
                reason: format!("unit price {price} is negative"),
            });
        }
        Ok(Self {
            product_id,
            name: name.into(),
            price,
            quantity,
        })
    }

    /// Unit price times quantity.
    pub fn subtotal(&self) -> Money {
        self.price.times(self.quantity)
    }
}

/// An order as announced on `order-created`.
///
/// Never mutated after creation; later statuses are derived from the events
/// that reference its id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub customer: Customer,
    #[serde(rename = "products")]
    pub items: Vec<LineItem>,
    pub total_amount: Money,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Creates a new order with a fresh id and computed total.
    pub fn create(customer: Customer, items: Vec<LineItem>) -> Result<Self> {
        if items.is_empty() {
            return Err(DomainError::NoItems);
        }
        let total_amount = items.iter().map(LineItem::subtotal).sum();
        Ok(Self {
            id: OrderId::new(),
            customer,
            items,
            total_amount,
            status: OrderStatus::Created,
            created_at: Utc::now(),
        })
    }
}
