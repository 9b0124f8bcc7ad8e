//! Common utilities for the exporter binary
//!
//! CLI parsing and the translation of flags into library configuration.

use anyhow::{bail, Context, Result};
use clap::Parser;
use exporter_core::config::constants::{DEFAULT_LISTEN_ADDR, DEFAULT_METRICS_PATH, DEFAULT_NAMESPACE};
use exporter_core::{FeedConfig, IngestStats, MetricsServerConfig};
use std::net::SocketAddr;
use std::time::Duration;

/// Prometheus exporter for crypto exchange order feeds
#[derive(Parser, Debug, Clone)]
#[command(author, version, about)]
pub struct ExporterArgs {
    /// The address to listen on for HTTP requests.
    #[arg(long, env = "CRYPTO_EXPORTER_LISTEN_ADDRESS", default_value = DEFAULT_LISTEN_ADDR)]
    pub listen_address: String,

    /// Path under which to expose metrics.
    #[arg(long, env = "CRYPTO_EXPORTER_ENDPOINT", default_value = DEFAULT_METRICS_PATH)]
    pub endpoint: String,

    /// Metrics namespace.
    #[arg(long, env = "CRYPTO_EXPORTER_NAMESPACE", default_value = DEFAULT_NAMESPACE)]
    pub namespace: String,

    /// Log level (RUST_LOG takes precedence)
    #[arg(short, long, env = "CRYPTO_EXPORTER_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Emit logs as JSON
    #[arg(long, env = "CRYPTO_EXPORTER_JSON_LOGS")]
    pub json_logs: bool,

    /// Override the bitcointrade websocket URL
    #[arg(long, env = "CRYPTO_EXPORTER_FEED_URL")]
    pub feed_url: Option<String>,

    /// Override the delay between reconnection attempts, in seconds
    #[arg(long, env = "CRYPTO_EXPORTER_RETRY_DELAY_SECS")]
    pub retry_delay_secs: Option<u64>,
}

impl ExporterArgs {
    /// Bitcointrade feed with CLI overrides applied, validated
    pub fn feed_config(&self) -> Result<FeedConfig> {
        let mut config = FeedConfig::bitcointrade();
        if let Some(url) = &self.feed_url {
            config.url = url.clone();
        }
        if let Some(secs) = self.retry_delay_secs {
            config.retry_delay = Duration::from_secs(secs);
        }

        config.validate().context("Invalid feed configuration")?;
        Ok(config)
    }

    pub fn server_config(&self) -> Result<MetricsServerConfig> {
        if !self.endpoint.starts_with('/') {
            bail!("Metrics endpoint must start with '/', got '{}'", self.endpoint);
        }

        Ok(MetricsServerConfig {
            listen_addr: parse_listen_address(&self.listen_address)?,
            metrics_path: self.endpoint.clone(),
        })
    }
}

/// Parse `host:port`, also accepting the bare `:port` form for all interfaces
pub fn parse_listen_address(addr: &str) -> Result<SocketAddr> {
    let full = if addr.starts_with(':') {
        format!("0.0.0.0{}", addr)
    } else {
        addr.to_string()
    };

    full.parse()
        .with_context(|| format!("Invalid listen address '{}'", addr))
}

/// Print final ingestion statistics
pub fn print_stats(stats: &IngestStats) {
    tracing::info!("=== Final Statistics ===");
    tracing::info!("Sessions established: {}", stats.sessions_established);
    tracing::info!("Events applied: {}", stats.events_applied);
    tracing::info!("Events dropped: {}", stats.events_dropped);
    tracing::info!("Events ignored: {}", stats.events_ignored);
}
