//! Prometheus metrics for foamtail
//!
//! This module tracks:
//! - The latest residual per variable and kind (the values foamtail exists to report)
//! - Log fetch outcomes and latency
//! - Per-metric extraction failures
//! - Background poller failures
//!
//! Metrics are exposed via the `/metrics` endpoint in Prometheus text format.

use crate::catalog::{MetricKey, ResidualKind};
use prometheus::{
    Encoder, GaugeVec, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;

/// Outcome of one log fetch, used as a metrics label
///
/// An enum rather than a free string keeps the label set bounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Success,
    Timeout,
    Transport,
    Status,
    ClientBuild,
}

impl FetchOutcome {
    /// Convert outcome to Prometheus label string
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchOutcome::Success => "success",
            FetchOutcome::Timeout => "timeout",
            FetchOutcome::Transport => "transport",
            FetchOutcome::Status => "status",
            FetchOutcome::ClientBuild => "client_build",
        }
    }
}

impl From<&crate::fetch::FetchError> for FetchOutcome {
    fn from(err: &crate::fetch::FetchError) -> Self {
        use crate::fetch::FetchError;
        match err {
            FetchError::ClientBuild(_) => FetchOutcome::ClientBuild,
            FetchError::Timeout { .. } => FetchOutcome::Timeout,
            FetchError::Transport { .. } => FetchOutcome::Transport,
            FetchError::Status { .. } => FetchOutcome::Status,
        }
    }
}

/// Metrics collector for foamtail
#[derive(Clone)]
pub struct Metrics {
    pub registry: Arc<Registry>,
    residuals: GaugeVec,
    fetch_total: IntCounterVec,
    fetch_duration: Histogram,
    extraction_failures: IntCounterVec,
    collections_total: IntCounter,
    background_task_failures: IntCounterVec,
}

impl Metrics {
    /// Create a new Metrics instance
    ///
    /// Registers all metrics with a new Prometheus registry.
    ///
    /// # Errors
    ///
    /// Returns an error if metric registration fails (e.g., duplicate names).
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        // Gauge: latest residual per variable and kind
        //
        // Cardinality: catalog variables × 2 kinds. The collector only
        // publishes variables listed in the catalog.
        let residuals = GaugeVec::new(
            Opts::new(
                "foamtail_residual",
                "Latest solver residual extracted from the log, by variable and kind",
            ),
            &["variable", "kind"],
        )?;

        let fetch_total = IntCounterVec::new(
            Opts::new(
                "foamtail_fetch_total",
                "Total number of solver log fetches by outcome",
            ),
            &["outcome"],
        )?;

        let fetch_duration = Histogram::with_opts(
            HistogramOpts::new(
                "foamtail_fetch_duration_ms",
                "Solver log fetch latency in milliseconds",
            )
            .buckets(vec![
                1.0, 5.0, 10.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2000.0, 5000.0,
            ]),
        )?;

        // Labels:
        // - variable, kind: which metric failed
        // - error_type: not_found, malformed_record, numeric_parse
        let extraction_failures = IntCounterVec::new(
            Opts::new(
                "foamtail_extraction_failures_total",
                "Total number of per-metric extraction failures by variable, kind and error type",
            ),
            &["variable", "kind", "error_type"],
        )?;

        let collections_total = IntCounter::new(
            "foamtail_collections_total",
            "Total number of completed collection batches",
        )?;

        // CRITICAL: Alert on ANY increment - the poller has stopped
        //
        // Labels:
        // - failure_type: panic, unexpected_termination
        let background_task_failures = IntCounterVec::new(
            Opts::new(
                "foamtail_background_task_failures_total",
                "Total number of background poller task failures by failure type",
            ),
            &["failure_type"],
        )?;

        registry.register(Box::new(residuals.clone()))?;
        registry.register(Box::new(fetch_total.clone()))?;
        registry.register(Box::new(fetch_duration.clone()))?;
        registry.register(Box::new(extraction_failures.clone()))?;
        registry.register(Box::new(collections_total.clone()))?;
        registry.register(Box::new(background_task_failures.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            residuals,
            fetch_total,
            fetch_duration,
            extraction_failures,
            collections_total,
            background_task_failures,
        })
    }

    /// Publish the latest value for a metric key
    ///
    /// # Errors
    ///
    /// Returns an error if `value` is NaN or infinite. A non-finite residual
    /// would turn every dashboard aggregate into NaN.
    pub fn record_residual(&self, key: &MetricKey, value: f64) -> Result<(), prometheus::Error> {
        if !value.is_finite() {
            tracing::warn!(
                metric = %key,
                value = value,
                "Refusing to publish non-finite residual"
            );
            return Err(prometheus::Error::Msg(format!(
                "residual for {} must be finite, got {}",
                key, value
            )));
        }

        self.residuals
            .get_metric_with_label_values(&[key.variable(), key.kind().as_str()])?
            .set(value);
        Ok(())
    }

    /// Published gauge value for a variable and kind
    ///
    /// Reads through the registry so a lookup never creates a series.
    /// Returns `None` for a series that has never been published.
    pub fn residual(&self, variable: &str, kind: ResidualKind) -> Option<f64> {
        let metric_families = self.registry.gather();
        metric_families
            .iter()
            .find(|mf| mf.name() == "foamtail_residual")?
            .get_metric()
            .iter()
            .find(|m| {
                m.get_label().iter().all(|label| match label.name() {
                    "variable" => label.value() == variable,
                    "kind" => label.value() == kind.as_str(),
                    _ => true,
                })
            })
            .map(|m| m.gauge.value.unwrap_or(0.0))
    }

    /// Record a log fetch and its latency
    pub fn record_fetch(&self, outcome: FetchOutcome, duration_ms: f64) {
        self.fetch_total.with_label_values(&[outcome.as_str()]).inc();
        if duration_ms.is_finite() && duration_ms >= 0.0 {
            self.fetch_duration.observe(duration_ms);
        }
    }

    /// Number of fetches recorded with the given outcome
    pub fn fetch_count(&self, outcome: FetchOutcome) -> u64 {
        self.fetch_total.with_label_values(&[outcome.as_str()]).get()
    }

    /// Record a per-metric extraction failure
    ///
    /// Callers pass `"other"` as the variable for keys outside the catalog
    /// so arbitrary request input cannot grow the label set.
    pub fn extraction_failure(&self, variable: &str, kind: ResidualKind, error_type: &str) {
        self.extraction_failures
            .with_label_values(&[variable, kind.as_str(), error_type])
            .inc();
    }

    /// Total extraction failures across all labels
    pub fn extraction_failures_count(&self) -> u64 {
        self.counter_family_total("foamtail_extraction_failures_total")
    }

    /// Record a completed collection batch
    pub fn collection_completed(&self) {
        self.collections_total.inc();
    }

    pub fn collections_count(&self) -> u64 {
        self.collections_total.get()
    }

    /// Record a background poller failure (panic or unexpected termination)
    pub fn background_task_failure(&self, failure_type: &str) {
        self.background_task_failures
            .with_label_values(&[failure_type])
            .inc();
    }

    /// Total background task failures across all failure types
    pub fn background_task_failures_count(&self) -> u64 {
        self.counter_family_total("foamtail_background_task_failures_total")
    }

    /// Sum a counter family across all label combinations
    fn counter_family_total(&self, name: &str) -> u64 {
        let metric_families = self.registry.gather();
        metric_families
            .iter()
            .find(|mf| mf.name() == name)
            .map(|mf| {
                mf.get_metric()
                    .iter()
                    .map(|m| m.counter.value.unwrap_or(0.0) as u64)
                    .sum()
            })
            .unwrap_or(0)
    }

    /// Gather all metrics and encode them in Prometheus text format
    ///
    /// # Errors
    ///
    /// Returns an error if metric encoding fails.
    pub fn gather(&self) -> Result<String, prometheus::Error> {
        let metric_families = self.registry.gather();

        tracing::debug!(
            metric_family_count = metric_families.len(),
            "Encoding metrics to Prometheus text format"
        );

        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        encoder.encode(&metric_families, &mut buffer)?;

        String::from_utf8(buffer).map_err(|e| {
            tracing::error!(
                invalid_byte_index = e.utf8_error().valid_up_to(),
                "Prometheus encoder produced invalid UTF-8"
            );
            prometheus::Error::Msg(format!("Failed to convert metrics to UTF-8: {}", e))
        })
    }
}
