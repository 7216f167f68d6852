use anyhow::Result;
use router_core::{RoutingMetrics, RoutingRegistry};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod replay;

use config::{ControllerConfig, LogFormat};

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = ControllerConfig::from_env()?;
    init_tracing(config.log_format);

    info!("Starting router-controller...");

    let metrics = RoutingMetrics::new()?;
    let registry = RoutingRegistry::new(metrics.clone());
    info!("Routing registry initialized");

    let events = replay::load_events(&config.events_file)?;
    info!("Loaded {} lifecycle events from {}", events.len(), config.events_file.display());

    let report = replay::replay(&registry, events).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    if config.print_metrics {
        print!("{}", metrics.gather()?);
    }

    Ok(())
}
