//! HTTP server for Prometheus metrics export
//!
//! Exposes a registry in the Prometheus text format at the configured path
//! for scraping, plus `/health` and a small help page at `/`.

use anyhow::{Context, Result};
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use prometheus::{Encoder, Registry, TextEncoder};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::config::constants::DEFAULT_METRICS_PATH;
use crate::utils::shutdown::wait_for_shutdown;

/// Configuration for the metrics HTTP server
#[derive(Debug, Clone)]
pub struct MetricsServerConfig {
    /// Address to bind to (e.g., "0.0.0.0:8080")
    pub listen_addr: SocketAddr,
    /// Path to serve metrics (default: "/metrics")
    pub metrics_path: String,
}

impl Default for MetricsServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            metrics_path: DEFAULT_METRICS_PATH.to_string(),
        }
    }
}

/// HTTP server for Prometheus metrics
pub struct MetricsServer {
    config: MetricsServerConfig,
    registry: Registry,
}

impl MetricsServer {
    pub fn new(config: MetricsServerConfig, registry: Registry) -> Self {
        Self { config, registry }
    }

    /// Bind the configured address and serve until `shutdown` flips.
    ///
    /// A bind failure is returned immediately.
    pub async fn serve(self, shutdown: watch::Receiver<bool>) -> Result<()> {
        let listener = TcpListener::bind(&self.config.listen_addr)
            .await
            .with_context(|| format!("Failed to bind metrics server on {}", self.config.listen_addr))?;

        self.serve_on(listener, shutdown).await
    }

    /// Serve on an already bound listener
    pub async fn serve_on(self, listener: TcpListener, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        let local_addr = listener.local_addr().context("Metrics listener has no local address")?;
        info!(
            "Metrics server listening on http://{}{}",
            local_addr, self.config.metrics_path
        );

        let registry = self.registry.clone();
        let metrics_path: Arc<str> = Arc::from(self.config.metrics_path.as_str());

        loop {
            let accepted = tokio::select! {
                result = listener.accept() => Some(result),
                _ = wait_for_shutdown(&mut shutdown) => None,
            };

            let (stream, remote_addr) = match accepted {
                Some(Ok(conn)) => conn,
                Some(Err(e)) => {
                    error!("Failed to accept connection: {}", e);
                    continue;
                }
                None => {
                    info!("Metrics server on {} shutting down", local_addr);
                    return Ok(());
                }
            };

            let registry = registry.clone();
            let metrics_path = metrics_path.clone();

            tokio::spawn(async move {
                let io = TokioIo::new(stream);

                let service = service_fn(move |req: Request<hyper::body::Incoming>| {
                    let response = route(req.uri().path(), &registry, &metrics_path);
                    async move { Ok::<_, hyper::Error>(response) }
                });

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    debug!("Connection error from {}: {}", remote_addr, err);
                }
            });
        }
    }

    /// Render the current registry contents
    pub fn serve_metrics_once(&self) -> Result<String> {
        encode_metrics(&self.registry)
    }
}

fn route(path: &str, registry: &Registry, metrics_path: &str) -> Response<Full<Bytes>> {
    debug!("Metrics request: {}", path);

    if path == metrics_path {
        return match encode_metrics(registry) {
            Ok(body) => text_response(StatusCode::OK, body, "text/plain; version=0.0.4"),
            Err(e) => {
                error!("Failed to encode metrics: {}", e);
                text_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Error: {}", e),
                    "text/plain",
                )
            }
        };
    }

    match path {
        "/health" | "/healthz" => text_response(StatusCode::OK, "OK".to_string(), "text/plain"),
        "/" => text_response(
            StatusCode::OK,
            format!(
                "Crypto Exporter\n\nEndpoints:\n  {} - Prometheus metrics\n  /health - Health check\n",
                metrics_path
            ),
            "text/plain",
        ),
        _ => {
            warn!("Unknown endpoint requested: {}", path);
            text_response(StatusCode::NOT_FOUND, "Not Found".to_string(), "text/plain")
        }
    }
}

fn text_response(status: StatusCode, body: String, content_type: &'static str) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}

/// Register the standard `process_*` metrics for this process.
///
/// Process stats are read from procfs, so this is a no-op off Linux.
#[cfg(target_os = "linux")]
pub fn register_process_metrics(registry: &Registry) -> prometheus::Result<()> {
    use prometheus::process_collector::ProcessCollector;

    registry.register(Box::new(ProcessCollector::for_self()))
}

#[cfg(not(target_os = "linux"))]
pub fn register_process_metrics(_registry: &Registry) -> prometheus::Result<()> {
    Ok(())
}

/// Encode a registry to the Prometheus text format
pub fn encode_metrics(registry: &Registry) -> Result<String> {
    let encoder = TextEncoder::new();
    let metric_families = registry.gather();

    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .context("Failed to encode metrics")?;

    String::from_utf8(buffer).context("Invalid UTF-8 in metrics")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ExchangeEvent, MarketLabels, Operation};
    use crate::monitoring::ExchangeMetrics;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    fn populated_registry() -> Registry {
        let registry = Registry::new();
        let metrics = ExchangeMetrics::new("crypto").unwrap();
        metrics.register(&registry).unwrap();

        let market = MarketLabels::new("BTC", "BRL", "bitcointrade");
        metrics.apply(
            &market,
            &ExchangeEvent::OrderCompleted {
                operation: Operation::Ask,
                amount: 0.25,
                unit_price: 150_000.0,
                created_at: None,
            },
        );
        registry
    }

    async fn get(addr: SocketAddr, path: &str) -> String {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        let request = format!("GET {} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n", path);
        stream.write_all(request.as_bytes()).await.unwrap();

        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        response
    }

    #[test]
    fn test_metrics_server_config_default() {
        let config = MetricsServerConfig::default();
        assert_eq!(config.metrics_path, "/metrics");
        assert_eq!(config.listen_addr.port(), 8080);
    }

    #[test]
    fn test_encode_metrics() {
        let encoded = encode_metrics(&populated_registry()).unwrap();

        assert!(encoded.contains("# HELP crypto_trade_count Number of executed orders."));
        assert!(encoded.contains("# TYPE crypto_trade_price gauge"));
        assert!(encoded.contains("crypto_trade_amount_sum{"));
        assert!(encoded.contains(r#"operation="ask""#));
        assert!(encoded.contains(r#"exchange_name="bitcointrade""#));
    }

    #[test]
    fn test_serve_metrics_once_empty_registry() {
        let server = MetricsServer::new(MetricsServerConfig::default(), Registry::new());
        assert_eq!(server.serve_metrics_once().unwrap(), "");
    }

    #[test]
    fn test_routes() {
        let registry = populated_registry();

        let metrics = route("/metrics", &registry, "/metrics");
        assert_eq!(metrics.status(), StatusCode::OK);
        assert_eq!(
            metrics.headers().get(CONTENT_TYPE).unwrap(),
            "text/plain; version=0.0.4"
        );

        assert_eq!(route("/health", &registry, "/metrics").status(), StatusCode::OK);
        assert_eq!(route("/", &registry, "/metrics").status(), StatusCode::OK);
        assert_eq!(route("/nope", &registry, "/metrics").status(), StatusCode::NOT_FOUND);

        // Custom path replaces the default one
        assert_eq!(route("/metrics", &registry, "/prom").status(), StatusCode::NOT_FOUND);
        assert_eq!(route("/prom", &registry, "/prom").status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_serve_and_shutdown() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (stop_tx, stop_rx) = watch::channel(false);

        let server = MetricsServer::new(MetricsServerConfig::default(), populated_registry());
        let handle = tokio::spawn(server.serve_on(listener, stop_rx));

        let scrape = get(addr, "/metrics").await;
        assert!(scrape.starts_with("HTTP/1.1 200"));
        assert!(scrape.contains("crypto_trade_count"));

        let health = get(addr, "/health").await;
        assert!(health.starts_with("HTTP/1.1 200"));

        let missing = get(addr, "/missing").await;
        assert!(missing.starts_with("HTTP/1.1 404"));

        stop_tx.send(true).unwrap();
        let stopped = tokio::time::timeout(Duration::from_secs(2), handle).await;
        assert!(stopped.unwrap().unwrap().is_ok());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_process_metrics_exported_next_to_exchange_metrics() {
        let registry = populated_registry();
        register_process_metrics(&registry).unwrap();

        let encoded = encode_metrics(&registry).unwrap();
        assert!(encoded.contains("process_start_time_seconds"));
        assert!(encoded.contains("crypto_trade_count"));

        // A second process collector would duplicate the descriptors
        assert!(register_process_metrics(&registry).is_err());
    }

    #[tokio::test]
    async fn test_bind_failure_is_error() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let config = MetricsServerConfig {
            listen_addr: taken.local_addr().unwrap(),
            metrics_path: "/metrics".to_string(),
        };
        let (_stop_tx, stop_rx) = watch::channel(false);

        let result = MetricsServer::new(config, Registry::new()).serve(stop_rx).await;
        assert!(result.is_err());
    }
}
