//! Default configuration values
//!
//! Keep-alive timings were tuned by inspecting the upstream feed by hand.

use std::time::Duration;

// ===== FEED KEEP-ALIVE =====

/// Client ping interval
pub const DEFAULT_PING_INTERVAL: Duration = Duration::from_secs(10);

/// Time allowed for the pong before the session counts as dropped
pub const DEFAULT_PING_TIMEOUT: Duration = Duration::from_secs(5);

// ===== RECONNECTION =====

/// Fixed delay between a failed/dropped session and the next attempt
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(3);

/// Upper bound for dialing plus the Engine.IO handshake, and for the
/// upstream to confirm the session
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

// ===== BITCOINTRADE =====

/// Bitcointrade Socket.IO endpoint (BTC-BRL only)
pub const BITCOINTRADE_WS_URL: &str =
    "wss://core.bitcointrade.com.br/socket.io/?EIO=3&transport=websocket";

pub const BITCOINTRADE_EXCHANGE: &str = "bitcointrade";
pub const BITCOINTRADE_BASE: &str = "BTC";
pub const BITCOINTRADE_QUOTE: &str = "BRL";

// ===== SCRAPE ENDPOINT =====

pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_METRICS_PATH: &str = "/metrics";
pub const DEFAULT_NAMESPACE: &str = "crypto";
