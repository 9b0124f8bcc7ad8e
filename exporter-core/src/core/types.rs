//! Normalized exchange domain types
//!
//! Everything the metric model consumes is expressed with these types.
//! Raw exchange data is converted here once, at the feed boundary:
//! - `Operation`: trade side with a total normalization from exchange codes
//! - `OrderEventKind`: order book event dimension (create/cancel)
//! - `ExchangeEvent`: the three inbound event variants
//! - `MarketLabels`: the per-feed constant label triple

use chrono::{DateTime, Utc};
use std::fmt;

/// Trade operation side, as exposed in the `operation` label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Bid,
    Ask,
    Unknown,
}

impl Operation {
    /// Normalize a raw exchange side code.
    ///
    /// Total over every integer: `1 → bid`, `2 → ask`, anything else
    /// (zero and negatives included) → `unknown`.
    #[inline]
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => Operation::Bid,
            2 => Operation::Ask,
            _ => Operation::Unknown,
        }
    }

    /// Label value for this side
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Bid => "bid",
            Operation::Ask => "ask",
            Operation::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order book event dimension (`event` label of `order_count`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderEventKind {
    Create,
    Cancel,
}

impl OrderEventKind {
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderEventKind::Create => "create",
            OrderEventKind::Cancel => "cancel",
        }
    }
}

impl fmt::Display for OrderEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A normalized inbound exchange event.
///
/// The side is already normalized; amounts and prices are carried as
/// received.
#[derive(Debug, Clone, PartialEq)]
pub enum ExchangeEvent {
    OrderCreated {
        operation: Operation,
        unit_price: f64,
        amount: f64,
    },
    OrderCanceled {
        operation: Operation,
        amount: f64,
        unit_price: f64,
    },
    OrderCompleted {
        operation: Operation,
        amount: f64,
        unit_price: f64,
        /// Accepted for completeness, never used for ordering
        created_at: Option<DateTime<Utc>>,
    },
}

impl ExchangeEvent {
    /// Normalized side of the event
    pub fn operation(&self) -> Operation {
        match self {
            ExchangeEvent::OrderCreated { operation, .. }
            | ExchangeEvent::OrderCanceled { operation, .. }
            | ExchangeEvent::OrderCompleted { operation, .. } => *operation,
        }
    }

    /// Short name used in logs
    pub fn kind_name(&self) -> &'static str {
        match self {
            ExchangeEvent::OrderCreated { .. } => "order_created",
            ExchangeEvent::OrderCanceled { .. } => "order_canceled",
            ExchangeEvent::OrderCompleted { .. } => "order_completed",
        }
    }
}

/// Constant `(base_currency, quote_currency, exchange_name)` labels for one feed
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MarketLabels {
    pub base_currency: String,
    pub quote_currency: String,
    pub exchange_name: String,
}

impl MarketLabels {
    pub fn new(
        base_currency: impl Into<String>,
        quote_currency: impl Into<String>,
        exchange_name: impl Into<String>,
    ) -> Self {
        Self {
            base_currency: base_currency.into(),
            quote_currency: quote_currency.into(),
            exchange_name: exchange_name.into(),
        }
    }
}

impl fmt::Display for MarketLabels {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}@{}",
            self.base_currency, self.quote_currency, self.exchange_name
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_known_side_codes() {
        assert_eq!(Operation::from_code(1), Operation::Bid);
        assert_eq!(Operation::from_code(2), Operation::Ask);
        assert_eq!(Operation::from_code(0), Operation::Unknown);
        assert_eq!(Operation::from_code(-1), Operation::Unknown);
        assert_eq!(Operation::from_code(3), Operation::Unknown);
    }

    #[test]
    fn test_label_values() {
        assert_eq!(Operation::Bid.as_str(), "bid");
        assert_eq!(Operation::Ask.to_string(), "ask");
        assert_eq!(Operation::Unknown.as_str(), "unknown");
        assert_eq!(OrderEventKind::Create.as_str(), "create");
        assert_eq!(OrderEventKind::Cancel.to_string(), "cancel");
    }

    #[test]
    fn test_market_labels_display() {
        let labels = MarketLabels::new("BTC", "BRL", "bitcointrade");
        assert_eq!(labels.to_string(), "BTC-BRL@bitcointrade");
    }

    /// Property: normalization is total and only 1/2 map to a known side
    #[test]
    fn prop_side_normalization_total() {
        proptest!(|(code in any::<i64>())| {
            let op = Operation::from_code(code);
            match code {
                1 => prop_assert_eq!(op, Operation::Bid),
                2 => prop_assert_eq!(op, Operation::Ask),
                _ => prop_assert_eq!(op, Operation::Unknown),
            }
        });
    }

    /// Property: normalizing the code of a normalized side is a no-op
    #[test]
    fn prop_side_normalization_idempotent() {
        proptest!(|(code in any::<i64>())| {
            let op = Operation::from_code(code);
            let code_again = match op {
                Operation::Bid => 1,
                Operation::Ask => 2,
                Operation::Unknown => code,
            };
            prop_assert_eq!(Operation::from_code(code_again), op);
        });
    }
}
