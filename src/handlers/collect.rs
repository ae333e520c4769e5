//! On-demand collection endpoint
//!
//! `GET /collect?metrics=intel/openfoam/Ux/final,intel/openfoam/p/initial`
//! runs one batch and returns the measurements as JSON. Without `metrics`
//! the whole catalog is collected.

use crate::collector::Measurement;
use crate::error::AppResult;
use crate::handlers::AppState;
use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;

/// Query parameters for GET /collect
#[derive(Debug, Default, Deserialize)]
pub struct CollectParams {
    /// Comma-separated metric namespaces
    pub metrics: Option<String>,
}

/// GET /collect handler
pub async fn handler(
    State(state): State<AppState>,
    Query(params): Query<CollectParams>,
) -> AppResult<Json<Vec<Measurement>>> {
    let requested: Vec<&str> = params
        .metrics
        .as_deref()
        .map(|list| {
            list.split(',')
                .map(str::trim)
                .filter(|ns| !ns.is_empty())
                .collect()
        })
        .unwrap_or_default();

    let collector = state.collector();
    let measurements = if requested.is_empty() {
        collector.collect_all().await?
    } else {
        collector.collect_namespaces(&requested).await?
    };

    Ok(Json(measurements))
}
