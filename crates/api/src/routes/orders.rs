//! Derived order status endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use domain::{OrderId, OrderLifecycle, SagaEvent, Topic};
use serde::Serialize;

use crate::AppState;
use crate::error::ApiError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStatusResponse {
    pub order_id: String,
    pub status: Option<String>,
    pub terminal: bool,
    pub failure_reason: Option<String>,
    pub completions: usize,
    pub failures: usize,
    pub notifications: usize,
    pub events: usize,
}

impl From<&OrderLifecycle> for OrderStatusResponse {
    fn from(lifecycle: &OrderLifecycle) -> Self {
        Self {
            order_id: lifecycle.order_id().to_string(),
            status: lifecycle.status().map(|s| s.as_str().to_string()),
            terminal: lifecycle.is_terminal(),
            failure_reason: lifecycle.failure_reason().map(str::to_string),
            completions: lifecycle.completions(),
            failures: lifecycle.failures(),
            notifications: lifecycle.notifications(),
            events: lifecycle.events_applied(),
        }
    }
}

/// GET /orders/{id}: folds every topic log into the order's status.
#[tracing::instrument(skip_all, fields(order_id = %id))]
pub async fn status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<OrderStatusResponse>, ApiError> {
    let order_id: OrderId = id
        .parse()
        .map_err(|e| ApiError::BadRequest(format!("invalid order id '{id}': {e}")))?;

    let mut lifecycle = OrderLifecycle::new(order_id);
    for topic in Topic::ALL {
        for message in state.bus.messages(topic.as_str()).await {
            // undecodable messages were already reported by the consumers
            if let Ok(envelope) = SagaEvent::from_message(&message) {
                lifecycle.apply(&envelope.payload);
            }
        }
    }

    if lifecycle.events_applied() == 0 {
        return Err(ApiError::NotFound(format!("order {order_id} not found")));
    }
    Ok(Json(OrderStatusResponse::from(&lifecycle)))
}
