//! foamtail binary
//!
//! Serves residual gauges over HTTP, or runs a single collection from the
//! command line.

use clap::Parser;
use foamtail::{
    cli::{Cli, Command, generate_config_template},
    config::Config,
    handlers::{self, AppState},
    poller::Poller,
    telemetry,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Command::Serve) {
        // Template generation needs no config file
        Command::Config { output } => match output {
            Some(path) => {
                std::fs::write(&path, generate_config_template())?;
                eprintln!("Wrote configuration template to {}", path);
            }
            None => print!("{}", generate_config_template()),
        },
        Command::Collect { metrics, pretty } => {
            let state = load_state(&cli.config)?;
            let collector = state.collector();
            let measurements = if metrics.is_empty() {
                collector.collect_all().await?
            } else {
                collector.collect_namespaces(&metrics).await?
            };

            let json = if pretty {
                serde_json::to_string_pretty(&measurements)?
            } else {
                serde_json::to_string(&measurements)?
            };
            println!("{}", json);
        }
        Command::MetricTypes => {
            let state = load_state(&cli.config)?;
            let catalog = state.collector().catalog();
            for key in catalog.metric_keys() {
                println!("{}", catalog.namespace(&key));
            }
        }
        Command::Serve => serve(load_state(&cli.config)?).await?,
    }

    Ok(())
}

/// Load configuration, initialize telemetry and build shared state
fn load_state(config_path: &str) -> Result<AppState, Box<dyn std::error::Error>> {
    let config = Arc::new(Config::from_file(config_path)?);
    telemetry::init(&config.observability.log_level);
    Ok(AppState::new(config)?)
}

async fn serve(state: AppState) -> Result<(), Box<dyn std::error::Error>> {
    let config = state.config().clone();

    tracing::info!(
        "Starting foamtail on {}:{}, reading {}/{}",
        config.server.host,
        config.server.port,
        config.source.base_url(),
        config.source.file_path()
    );

    let poller = Arc::new(Poller::new(
        state.collector().clone(),
        Duration::from_secs(config.collection.interval_seconds),
    ));
    poller.start();

    let app = handlers::router(state);

    let addr = SocketAddr::from((
        config
            .server
            .host
            .parse::<std::net::IpAddr>()
            .unwrap_or_else(|_| std::net::IpAddr::from([0, 0, 0, 0])),
        config.server.port,
    ));

    tracing::info!("Listening on {}", addr);
    tracing::info!("Metrics available at http://{}/metrics", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
