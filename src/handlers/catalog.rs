//! Metric types endpoint
//!
//! Lists every namespace the catalog advertises via GET /metric-types

use crate::handlers::AppState;
use axum::{Json, extract::State};
use serde::Serialize;

/// Response for GET /metric-types
#[derive(Debug, Serialize)]
pub struct MetricTypesResponse {
    pub metrics: Vec<String>,
}

/// GET /metric-types handler
pub async fn handler(State(state): State<AppState>) -> Json<MetricTypesResponse> {
    let catalog = state.collector().catalog();
    let metrics = catalog
        .metric_keys()
        .iter()
        .map(|key| catalog.namespace(key))
        .collect();

    Json(MetricTypesResponse { metrics })
}
