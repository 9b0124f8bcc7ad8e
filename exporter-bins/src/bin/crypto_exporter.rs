//! Crypto Exporter
//!
//! Streams the bitcointrade BTC-BRL order feed into Prometheus instruments
//! and serves them for scraping until Ctrl+C.

use anyhow::{Context, Result};
use clap::Parser;
use exporter_bins::common::{print_stats, ExporterArgs};
use exporter_core::feed::WebSocketTransport;
use exporter_core::monitoring::{register_process_metrics, Registry};
use exporter_core::utils::init_logger;
use exporter_core::{ConnectionManager, ExchangeMetrics, MetricsServer};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let args = ExporterArgs::parse();
    init_logger(&args.log_level, args.json_logs)?;

    info!(
        "Crypto Exporter v{} started, listening on {}.",
        env!("CARGO_PKG_VERSION"),
        args.listen_address
    );
    info!("Parameters: endpoint={}, namespace={}", args.endpoint, args.namespace);

    let feed = args.feed_config()?;
    let server_config = args.server_config()?;

    let registry = Registry::new();
    let metrics = Arc::new(
        ExchangeMetrics::new(&args.namespace)
            .with_context(|| format!("Invalid metrics namespace '{}'", args.namespace))?,
    );
    metrics
        .register(&registry)
        .context("Cannot register exchange metrics")?;
    register_process_metrics(&registry).context("Cannot register process metrics")?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    ctrlc::set_handler(move || {
        warn!("Received Ctrl+C, initiating graceful shutdown...");
        let _ = shutdown_tx.send(true);
    })?;

    // Stream metrics from the exchange in background
    let manager = ConnectionManager::new(WebSocketTransport::from_config(&feed), &feed, metrics);
    let mut feed_task = tokio::spawn(manager.run(shutdown_rx.clone()));

    let server = MetricsServer::new(server_config, registry);
    let served = tokio::select! {
        served = server.serve(shutdown_rx) => served,
        finished = &mut feed_task => {
            let stats = finished.context("Feed task panicked")??;
            print_stats(&stats);
            return Ok(());
        }
    };
    served?;

    let stats = feed_task.await.context("Feed task panicked")??;
    print_stats(&stats);
    info!("Crypto Exporter stopped");

    Ok(())
}
