use std::time::Duration;

use super::constants::*;
use crate::core::MarketLabels;
use crate::feed::EventNames;

/// Configuration of one exchange feed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedConfig {
    /// Socket.IO websocket endpoint
    pub url: String,

    /// Constant labels applied to every event of this feed
    pub market: MarketLabels,

    /// Upstream event names
    pub events: EventNames,

    /// Client keep-alive ping interval
    pub ping_interval: Duration,

    /// Pong deadline after each ping
    pub ping_timeout: Duration,

    /// Dial + handshake + establishment timeout
    pub connect_timeout: Duration,

    /// Fixed delay between attempts
    pub retry_delay: Duration,
}

impl FeedConfig {
    /// Bitcointrade BTC-BRL feed
    pub fn bitcointrade() -> Self {
        Self {
            url: BITCOINTRADE_WS_URL.to_string(),
            market: MarketLabels::new(BITCOINTRADE_BASE, BITCOINTRADE_QUOTE, BITCOINTRADE_EXCHANGE),
            events: EventNames::default(),
            ping_interval: DEFAULT_PING_INTERVAL,
            ping_timeout: DEFAULT_PING_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }

    /// Feed name used in logs
    pub fn name(&self) -> &str {
        &self.market.exchange_name
    }
}
