//! Command-line interface for foamtail
//!
//! Provides argument parsing and subcommand handling for the foamtail binary.

use clap::{Parser, Subcommand};

/// OpenFOAM residual collector
#[derive(Parser)]
#[command(name = "foamtail")]
#[command(version)]
#[command(about = "Collects OpenFOAM solver residuals from an HTTP-served log")]
#[command(
    long_about = "foamtail fetches a running simulation's solver log over HTTP, extracts \
    the latest initial and final residual for each field variable, and exports them as \
    Prometheus gauges or one-shot JSON measurements."
)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "foamtail.toml", global = true)]
    pub config: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP server and background collection (default)
    Serve,

    /// Fetch the log once and print measurements as JSON
    Collect {
        /// Metric namespaces, e.g. intel/openfoam/Ux/final (all when omitted)
        metrics: Vec<String>,

        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// List the metric namespaces this configuration advertises
    MetricTypes,

    /// Generate a template configuration file
    Config {
        /// Output file path (prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<String>,
    },
}

/// Generate template configuration content
pub fn generate_config_template() -> &'static str {
    r#"# foamtail Configuration
# ======================
#
# Where to find the solver log, how often to read it, and which residuals
# to report.

# ─────────────────────────────────────────────────────────────────────────────
# SERVER CONFIGURATION
# ─────────────────────────────────────────────────────────────────────────────

[server]
# IP address foamtail binds to (0.0.0.0 for all interfaces)
host = "0.0.0.0"

# Port serving /metrics, /collect, /metric-types and /health
port = 9108

# ─────────────────────────────────────────────────────────────────────────────
# LOG SOURCE (required)
# ─────────────────────────────────────────────────────────────────────────────
#
# The solver log must be reachable as http://<host>:<port>/<file_path>,
# e.g. `python3 -m http.server 8000` in the case directory.

[source]
# Host serving the log; also reported as the `hostname` tag
host = "10.1.0.1"

# Port of the log server
port = 8000

# Path of the log relative to the server root
file_path = "log.simpleFoam"

# Give up on a fetch after this many seconds (1-300)
timeout_seconds = 2

# ─────────────────────────────────────────────────────────────────────────────
# COLLECTION
# ─────────────────────────────────────────────────────────────────────────────

[collection]
# Seconds between background collections
interval_seconds = 10

# What to do when one metric cannot be extracted:
#   - "fail_fast": abort the whole batch with that error
#   - "skip": log it, count it, and report the other metrics
on_metric_error = "fail_fast"

# ─────────────────────────────────────────────────────────────────────────────
# CATALOG
# ─────────────────────────────────────────────────────────────────────────────
#
# Metrics are named {vendor}/{plugin}/{variable}/{initial|final}.

[catalog]
vendor = "intel"
plugin = "openfoam"
variables = ["k", "p", "Ux", "Uy", "Uz", "omega"]

# ─────────────────────────────────────────────────────────────────────────────
# OBSERVABILITY
# ─────────────────────────────────────────────────────────────────────────────

[observability]
# Log level: "trace", "debug", "info", "warn", "error"
log_level = "info"
"#
}
