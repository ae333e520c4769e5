//! Background polling
//!
//! Runs a collection batch over the whole catalog on a fixed interval so the
//! residual gauges on `/metrics` track the running simulation. Failed batches
//! are logged and the loop continues with the next tick; there is no retry
//! within a tick.

use crate::collector::Collector;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Periodic collector driver
pub struct Poller {
    collector: Arc<Collector>,
    interval: Duration,
}

impl Poller {
    pub fn new(collector: Arc<Collector>, interval: Duration) -> Self {
        Self {
            collector,
            interval,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run one batch over the whole catalog
    ///
    /// Returns the number of values published.
    pub async fn poll_once(&self) -> usize {
        match self.collector.collect_all().await {
            Ok(measurements) => {
                tracing::debug!(
                    collected = measurements.len(),
                    "Scheduled collection succeeded"
                );
                measurements.len()
            }
            Err(e) => {
                tracing::warn!(error = %e, "Scheduled collection failed");
                0
            }
        }
    }

    /// Start the polling loop on the tokio runtime
    ///
    /// Spawns the loop plus a monitor task that reports if the loop ever
    /// stops, since a dead poller leaves stale gauges behind. Returns the
    /// monitor task's handle.
    pub fn start(self: Arc<Self>) -> JoinHandle<()> {
        let metrics = self.collector.metrics().clone();
        let interval = self.interval;

        let handle = tokio::spawn(async move {
            tracing::info!(
                interval_seconds = interval.as_secs(),
                "Starting background collection"
            );

            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                self.poll_once().await;
            }
        });

        // Monitor the polling task to detect failures
        tokio::spawn(async move {
            match handle.await {
                Ok(_) => {
                    metrics.background_task_failure("unexpected_termination");
                    tracing::error!(
                        "Background collection task terminated unexpectedly. \
                        Residual gauges will no longer update."
                    );
                }
                Err(e) if e.is_cancelled() => {
                    tracing::info!("Background collection task cancelled");
                }
                Err(e) => {
                    metrics.background_task_failure("panic");
                    tracing::error!(
                        error = %e,
                        "Background collection task panicked. \
                        Residual gauges will no longer update."
                    );
                }
            }
        })
    }
}
