//! Analytics snapshot endpoint.

use std::sync::Arc;

use analytics::AnalyticsSnapshot;
use axum::Json;
use axum::extract::State;

use crate::AppState;

/// GET /analytics: returns the current counters and top products.
pub async fn snapshot(State(state): State<Arc<AppState>>) -> Json<AnalyticsSnapshot> {
    Json(state.analytics.snapshot().await)
}
