//! Test helper utilities
//!
//! - Wire payload builders for the three order events
//! - Feed config with short timings
//! - Polling assertion for asynchronous effects

use serde_json::json;
use std::time::{Duration, Instant};

use crate::config::FeedConfig;
use crate::feed::SessionEvent;

/// `order` message as sent by the upstream
pub fn order_message(side: i64, unit_price: f64, amount: f64) -> SessionEvent {
    SessionEvent::message(
        "order",
        json!({ "type": side, "unit_price": unit_price, "amount": amount }).to_string(),
    )
}

/// `cancel_order` message
pub fn cancel_message(side: i64, unit_price: f64, amount: f64) -> SessionEvent {
    SessionEvent::message(
        "cancel_order",
        json!({ "type": side, "unit_price": unit_price, "amount": amount }).to_string(),
    )
}

/// `order_completed` message
pub fn completed_message(side: i64, unit_price: f64, amount: f64) -> SessionEvent {
    SessionEvent::message(
        "order_completed",
        json!({
            "type": side,
            "unit_price": unit_price,
            "amount": amount,
            "create_date": "2019-01-10T12:00:00.000Z",
        })
        .to_string(),
    )
}

/// Bitcointrade feed config with millisecond timings
pub fn fast_feed_config() -> FeedConfig {
    let mut config = FeedConfig::bitcointrade();
    config.retry_delay = Duration::from_millis(10);
    config.connect_timeout = Duration::from_millis(200);
    config
}

/// Poll `condition` every few milliseconds until it holds or `timeout` passes
pub async fn eventually<F>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let start = Instant::now();
    loop {
        if condition() {
            return true;
        }
        if start.elapsed() >= timeout {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
