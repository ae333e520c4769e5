//! Collection batches
//!
//! A batch fetches the solver log once and runs one independent extraction
//! per requested metric against the same in-memory document. Fetch failures
//! abort the batch; what happens on a per-metric failure is decided by the
//! configured [`ErrorPolicy`].

use crate::catalog::{Catalog, MetricKey, ResidualKind};
use crate::config::{Config, ErrorPolicy};
use crate::error::{AppError, AppResult};
use crate::extract::extract_all;
use crate::fetch::{HttpFetcher, LogFetcher};
use crate::metrics::{FetchOutcome, Metrics};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

/// One extracted value, ready for the monitoring pipeline
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Measurement {
    /// Full namespace, e.g. `intel/openfoam/Ux/final`
    pub namespace: String,
    pub variable: String,
    pub kind: ResidualKind,
    pub value: f64,
    /// Wall-clock capture time, not a time read from the log
    pub timestamp: DateTime<Utc>,
    pub tags: BTreeMap<String, String>,
}

/// Fetches the log and turns metric keys into measurements
pub struct Collector {
    fetcher: Arc<dyn LogFetcher>,
    catalog: Catalog,
    file_path: String,
    hostname: String,
    policy: ErrorPolicy,
    metrics: Arc<Metrics>,
}

impl Collector {
    /// Create a collector around an existing fetcher
    pub fn new(fetcher: Arc<dyn LogFetcher>, config: &Config, metrics: Arc<Metrics>) -> Self {
        Self {
            fetcher,
            catalog: Catalog::from(&config.catalog),
            file_path: config.source.file_path().to_string(),
            hostname: config.source.host().to_string(),
            policy: config.collection.on_metric_error,
            metrics,
        }
    }

    /// Create a collector that fetches over HTTP from `[source]`
    ///
    /// # Errors
    ///
    /// Returns `AppError::Fetch` if the HTTP client cannot be built.
    pub fn from_config(config: &Config, metrics: Arc<Metrics>) -> AppResult<Self> {
        let fetcher = HttpFetcher::new(config.source.base_url(), config.source.timeout_seconds())?;
        Ok(Self::new(Arc::new(fetcher), config, metrics))
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn policy(&self) -> ErrorPolicy {
        self.policy
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Fetch the log once and decode it as text
    ///
    /// Invalid UTF-8 is replaced rather than rejected; residual lines are
    /// plain ASCII and unrelated solver output should not fail the batch.
    pub async fn fetch_log(&self) -> AppResult<String> {
        let start = Instant::now();
        let result = self.fetcher.fetch(&self.file_path).await;
        let duration_ms = start.elapsed().as_secs_f64() * 1000.0;

        match result {
            Ok(bytes) => {
                self.metrics.record_fetch(FetchOutcome::Success, duration_ms);
                Ok(String::from_utf8_lossy(&bytes).into_owned())
            }
            Err(e) => {
                self.metrics.record_fetch(FetchOutcome::from(&e), duration_ms);
                tracing::warn!(
                    file_path = %self.file_path,
                    error = %e,
                    duration_ms = duration_ms,
                    "Failed to fetch solver log"
                );
                Err(AppError::Fetch(e))
            }
        }
    }

    /// Collect every metric in the catalog
    pub async fn collect_all(&self) -> AppResult<Vec<Measurement>> {
        let keys = self.catalog.metric_keys();
        self.collect(&keys).await
    }

    /// Parse namespace strings through the catalog and collect them
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidMetricKey` for the first unparseable
    /// namespace, before anything is fetched.
    pub async fn collect_namespaces<S: AsRef<str>>(
        &self,
        namespaces: &[S],
    ) -> AppResult<Vec<Measurement>> {
        let keys = namespaces
            .iter()
            .map(|ns| self.catalog.parse_namespace(ns.as_ref()))
            .collect::<AppResult<Vec<_>>>()?;
        self.collect(&keys).await
    }

    /// Run one collection batch for `keys`
    ///
    /// An empty request returns an empty batch without fetching.
    ///
    /// # Errors
    ///
    /// - `AppError::Fetch` if the log cannot be retrieved (always fatal)
    /// - `AppError::Extract` for the first failing metric under `ErrorPolicy::FailFast`
    pub async fn collect(&self, keys: &[MetricKey]) -> AppResult<Vec<Measurement>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let span = tracing::info_span!(
            "collection",
            collection_id = %Uuid::new_v4(),
            requested = keys.len()
        );

        self.run_batch(keys).instrument(span).await
    }

    async fn run_batch(&self, keys: &[MetricKey]) -> AppResult<Vec<Measurement>> {
        let log_text = self.fetch_log().await?;

        let mut measurements = Vec::with_capacity(keys.len());
        let mut publish = Vec::with_capacity(keys.len());
        for (key, result) in extract_all(keys, &log_text) {
            let namespace = self.catalog.namespace(&key);
            let in_catalog = self.catalog.contains(key.variable());

            let value = match result {
                Ok(value) => value,
                Err(e) => {
                    let label = if in_catalog { key.variable() } else { "other" };
                    self.metrics
                        .extraction_failure(label, key.kind(), e.error_type());
                    match self.policy {
                        ErrorPolicy::FailFast => {
                            tracing::warn!(
                                metric = %namespace,
                                error = %e,
                                "Extraction failed, aborting batch"
                            );
                            return Err(AppError::Extract {
                                namespace,
                                source: e,
                            });
                        }
                        ErrorPolicy::Skip => {
                            tracing::warn!(
                                metric = %namespace,
                                error = %e,
                                "Extraction failed, omitting metric"
                            );
                            continue;
                        }
                    }
                }
            };

            measurements.push(Measurement {
                namespace,
                variable: key.variable().to_string(),
                kind: key.kind(),
                value,
                timestamp: Utc::now(),
                tags: BTreeMap::from([("hostname".to_string(), self.hostname.clone())]),
            });
            if in_catalog {
                publish.push((key, value));
            }
        }

        // Gauges only move once the whole batch has succeeded
        for (key, value) in publish {
            if let Err(e) = self.metrics.record_residual(&key, value) {
                tracing::debug!(metric = %key, error = %e, "Residual not published");
            }
        }

        self.metrics.collection_completed();
        tracing::debug!(collected = measurements.len(), "Collection batch completed");
        Ok(measurements)
    }
}
