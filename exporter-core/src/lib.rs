//! Exporter Core - Prometheus exporter for crypto exchange order feeds
//!
//! Subscribes to an exchange's realtime Socket.IO feed, normalizes order
//! lifecycle events and keeps running aggregates as Prometheus instruments
//! ready for scraping.
//!
//! ## Architecture
//! - **One session per feed**, owned by a reconnect loop that never gives up
//! - **Fixed retry delay** between attempts (3 s by default)
//! - **Message passing** from the websocket task to the manager
//! - **Coarse lock** around the instrument set so scrapes see whole events
//!
//! ## Core Modules
//! - `core`: Domain types, connection state machine, errors
//! - `feed`: Wire payloads, handler table, Socket.IO codec, transports
//! - `resilience`: Retry delay and the connection manager
//! - `monitoring`: Metric model and the scrape endpoint
//! - `config`: Feed configuration and defaults
//! - `utils`: Logging setup and shutdown signal
//! - `testing`: Scripted transport and helpers for tests (`testing` feature)

pub mod config;
pub mod core;
pub mod feed;
pub mod monitoring;
pub mod resilience;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod utils;

// Re-export core types
pub use crate::core::{ExchangeEvent, FeedError, MarketLabels, Operation, OrderEventKind};

pub use config::FeedConfig;
pub use monitoring::{ExchangeMetrics, MetricsServer, MetricsServerConfig};
pub use resilience::{ConnectionManager, IngestStats};

// Re-export error types
pub use anyhow::{Error, Result};

/// Prelude for convenient imports
pub mod prelude {
    // Core types
    pub use crate::core::{ConnectionState, ExchangeEvent, MarketLabels, Operation};

    // Feed
    pub use crate::config::FeedConfig;
    pub use crate::feed::{EventNames, Session, SessionEvent, Transport, WebSocketTransport};

    // Ingestion and export
    pub use crate::monitoring::{ExchangeMetrics, MetricsServer, MetricsServerConfig};
    pub use crate::resilience::ConnectionManager;

    // Error types
    pub use crate::{Error, Result};
}
