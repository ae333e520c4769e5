//! Health check endpoint
//!
//! Provides a simple health check for monitoring and load balancers.

use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;

use crate::handlers::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: &'static str,
    /// Background collection status: "operational" or "stopped"
    pub collection_status: &'static str,
}

/// Health check handler
///
/// Returns 200 OK. `collection_status` is "stopped" once the background
/// poller has panicked or exited, since gauges are then no longer refreshed.
/// It does not reflect whether the last fetch succeeded; see
/// `foamtail_fetch_total` for that.
pub async fn handler(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let collection_status = if state.metrics().background_task_failures_count() > 0 {
        "stopped"
    } else {
        "operational"
    };

    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "OK",
            collection_status,
        }),
    )
}
