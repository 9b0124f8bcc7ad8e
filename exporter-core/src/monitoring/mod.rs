//! Monitoring and observability module
//!
//! The exchange metric model and the HTTP server Prometheus scrapes.

pub mod metrics;
pub mod server;

pub use metrics::{ExchangeMetrics, MetricDescriptor, MetricKind, MetricsSnapshot, Sample};
pub use server::{encode_metrics, register_process_metrics, MetricsServer, MetricsServerConfig};

// Registry the binaries expose
pub use prometheus::Registry;
