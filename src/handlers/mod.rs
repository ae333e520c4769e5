//! HTTP request handlers for foamtail
//!
//! Thin adapters over [`Collector`]: no extraction logic lives here.

use crate::collector::Collector;
use crate::config::Config;
use crate::error::AppResult;
use crate::metrics::Metrics;
use axum::{Router, routing::get};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub mod catalog;
pub mod collect;
pub mod health;
pub mod metrics;

/// Application state shared across all handlers
///
/// All fields are Arc'd for cheap cloning across Axum handlers.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    collector: Arc<Collector>,
    metrics: Arc<Metrics>,
}

impl AppState {
    /// Create a new AppState that fetches the log over HTTP
    ///
    /// # Errors
    ///
    /// Returns an error if metrics registration or HTTP client construction fails.
    pub fn new(config: Arc<Config>) -> AppResult<Self> {
        let metrics = Arc::new(Metrics::new().map_err(|e| {
            crate::error::AppError::Internal(format!("Failed to register metrics: {}", e))
        })?);
        let collector = Arc::new(Collector::from_config(&config, metrics.clone())?);
        Ok(Self::with_collector(config, collector))
    }

    /// Create an AppState around an existing collector
    pub fn with_collector(config: Arc<Config>, collector: Arc<Collector>) -> Self {
        let metrics = Arc::new(collector.metrics().clone());
        Self {
            config,
            collector,
            metrics,
        }
    }

    /// Get reference to the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Shared handle to the collector (also driven by the background poller)
    pub fn collector(&self) -> &Arc<Collector> {
        &self.collector
    }

    /// Get reference to the metrics registry
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }
}

/// Build the HTTP router with all routes
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::handler))
        .route("/metric-types", get(catalog::handler))
        .route("/collect", get(collect::handler))
        .route("/metrics", get(metrics::handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
