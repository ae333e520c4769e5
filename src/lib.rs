//! foamtail - OpenFOAM residual collector
//!
//! Fetches a running simulation's solver log over HTTP, extracts the latest
//! initial/final residual per field variable, and reports them as
//! timestamped measurements and Prometheus gauges.

pub mod catalog;
pub mod cli;
pub mod collector;
pub mod config;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod handlers;
pub mod metrics;
pub mod poller;
pub mod telemetry;
