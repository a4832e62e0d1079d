//! Named topics that connect the fulfillment services.

use serde::{Deserialize, Serialize};

use crate::DomainError;

/// A topic on the event bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Topic {
    OrderCreated,
    PaymentProcessed,
    InventoryUpdated,
    ShippingPrepared,
    OrderCompleted,
    OrderFailed,
    NotificationSent,
}

impl Topic {
    /// Every topic, in saga order.
    pub const ALL: [Topic; 7] = [
        Topic::OrderCreated,
        Topic::PaymentProcessed,
        Topic::InventoryUpdated,
        Topic::ShippingPrepared,
        Topic::OrderCompleted,
        Topic::OrderFailed,
        Topic::NotificationSent,
    ];

    /// Returns the topic name used on the bus.
    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::OrderCreated => "order-created",
            Topic::PaymentProcessed => "payment-processed",
            Topic::InventoryUpdated => "inventory-updated",
            Topic::ShippingPrepared => "shipping-prepared",
            Topic::OrderCompleted => "order-completed",
            Topic::OrderFailed => "order-failed",
            Topic::NotificationSent => "notification-sent",
        }
    }

    /// Topic names for a subscription call.
    pub fn names(topics: &[Topic]) -> Vec<&'static str> {
        topics.iter().map(Topic::as_str).collect()
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Topic {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Topic::ALL
            .into_iter()
            .find(|topic| topic.as_str() == s)
            .ok_or_else(|| DomainError::UnknownTopic(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip_through_from_str() {
        for topic in Topic::ALL {
            assert_eq!(topic.as_str().parse::<Topic>().unwrap(), topic);
        }
    }

    #[test]
    fn unknown_topic_rejected() {
        assert!(matches!(
            "order-validated".parse::<Topic>(),
            Err(DomainError::UnknownTopic(_))
        ));
    }

    #[test]
    fn serde_uses_bus_names() {
        let json = serde_json::to_string(&Topic::ShippingPrepared).unwrap();
        assert_eq!(json, "\"shipping-prepared\"");
    }
}
