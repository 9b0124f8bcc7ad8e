//! Exchange wire payloads and their normalization
//!
//! Each named upstream event carries a JSON object. Missing numeric fields
//! decode as zero (a missing side code therefore normalizes to `unknown`);
//! a payload that is not an object of the expected shape is a
//! [`DecodeError`]. Trade timestamps are informational: one that does not
//! parse becomes `None` instead of costing the trade.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer};

use crate::core::{DecodeError, ExchangeEvent, Operation};

/// Message sent by the server when an order is created
#[derive(Debug, Clone, Deserialize)]
pub struct OrderMessage {
    #[serde(rename = "type", default)]
    pub side: i64,
    #[serde(default)]
    pub unit_price: f64,
    #[serde(default)]
    pub amount: f64,
}

/// Message sent by the server when an order is canceled
#[derive(Debug, Clone, Deserialize)]
pub struct CancelOrderMessage {
    #[serde(rename = "type", default)]
    pub side: i64,
    #[serde(default)]
    pub amount: f64,
    #[serde(default)]
    pub unit_price: f64,
}

/// Message sent by the server when an order is executed
#[derive(Debug, Clone, Deserialize)]
pub struct OrderCompletedMessage {
    #[serde(rename = "create_date", default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "type", default)]
    pub side: i64,
    #[serde(default)]
    pub amount: f64,
    #[serde(default)]
    pub unit_price: f64,
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(serde_json::Value::String(text)) => parse_timestamp(&text),
        _ => None,
    })
}

/// RFC 3339, or a naive ISO 8601 timestamp taken as UTC
fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Which exchange event variant a named upstream event decodes into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    OrderCreated,
    OrderCanceled,
    OrderCompleted,
}

impl EventKind {
    /// Decode a raw JSON payload into a normalized event
    pub fn decode(&self, event: &str, payload: &str) -> Result<ExchangeEvent, DecodeError> {
        let wrap = |source| DecodeError {
            event: event.to_string(),
            source,
        };

        let decoded = match self {
            EventKind::OrderCreated => {
                let msg: OrderMessage = serde_json::from_str(payload).map_err(wrap)?;
                ExchangeEvent::OrderCreated {
                    operation: Operation::from_code(msg.side),
                    unit_price: msg.unit_price,
                    amount: msg.amount,
                }
            }
            EventKind::OrderCanceled => {
                let msg: CancelOrderMessage = serde_json::from_str(payload).map_err(wrap)?;
                ExchangeEvent::OrderCanceled {
                    operation: Operation::from_code(msg.side),
                    amount: msg.amount,
                    unit_price: msg.unit_price,
                }
            }
            EventKind::OrderCompleted => {
                let msg: OrderCompletedMessage = serde_json::from_str(payload).map_err(wrap)?;
                ExchangeEvent::OrderCompleted {
                    operation: Operation::from_code(msg.side),
                    amount: msg.amount,
                    unit_price: msg.unit_price,
                    created_at: msg.created_at,
                }
            }
        };

        Ok(decoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_decode_order_created() {
        let event = EventKind::OrderCreated
            .decode("order", r#"{"type":1,"unit_price":50000.0,"amount":0.1}"#)
            .unwrap();

        match event {
            ExchangeEvent::OrderCreated { operation, unit_price, amount } => {
                assert_eq!(operation, Operation::Bid);
                assert_relative_eq!(unit_price, 50000.0);
                assert_relative_eq!(amount, 0.1);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_decode_cancel_with_unknown_side() {
        let event = EventKind::OrderCanceled
            .decode("cancel_order", r#"{"type":7,"amount":1.5,"unit_price":10}"#)
            .unwrap();
        assert_eq!(event.operation(), Operation::Unknown);
        assert_eq!(event.kind_name(), "order_canceled");
    }

    #[test]
    fn test_decode_order_completed_with_date() {
        let payload = r#"{
            "create_date": "2018-03-01T12:30:00Z",
            "type": 2,
            "amount": 0.05,
            "unit_price": 51000
        }"#;
        let event = EventKind::OrderCompleted.decode("order_completed", payload).unwrap();

        match event {
            ExchangeEvent::OrderCompleted { operation, amount, unit_price, created_at } => {
                assert_eq!(operation, Operation::Ask);
                assert_relative_eq!(amount, 0.05);
                assert_relative_eq!(unit_price, 51000.0);
                assert!(created_at.is_some());
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_missing_fields_default_to_zero() {
        let event = EventKind::OrderCompleted.decode("order_completed", "{}").unwrap();
        match event {
            ExchangeEvent::OrderCompleted { operation, amount, created_at, .. } => {
                assert_eq!(operation, Operation::Unknown);
                assert_relative_eq!(amount, 0.0);
                assert!(created_at.is_none());
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_malformed_payloads_rejected() {
        assert!(EventKind::OrderCreated.decode("order", "not json").is_err());
        assert!(EventKind::OrderCreated.decode("order", r#"{"type":"bid"}"#).is_err());
        assert!(EventKind::OrderCreated.decode("order", "null").is_err());

        let err = EventKind::OrderCompleted
            .decode("order_completed", r#"{"type":"ask","amount":1}"#)
            .unwrap_err();
        assert_eq!(err.event, "order_completed");
    }

    #[test]
    fn test_unparsable_trade_date_keeps_the_trade() {
        for date in [r#""yesterday""#, r#""""#, "12345", "null"] {
            let payload = format!(
                r#"{{"create_date":{},"type":2,"amount":0.5,"unit_price":100}}"#,
                date
            );
            let event = EventKind::OrderCompleted
                .decode("order_completed", &payload)
                .unwrap();

            match event {
                ExchangeEvent::OrderCompleted { operation, amount, created_at, .. } => {
                    assert_eq!(operation, Operation::Ask);
                    assert_relative_eq!(amount, 0.5);
                    assert!(created_at.is_none(), "date {} should be dropped", date);
                }
                other => panic!("unexpected event {:?}", other),
            }
        }
    }

    #[test]
    fn test_naive_trade_date_taken_as_utc() {
        let event = EventKind::OrderCompleted
            .decode("order_completed", r#"{"create_date":"2019-01-10T12:00:00","type":1}"#)
            .unwrap();

        let expected = Utc.with_ymd_and_hms(2019, 1, 10, 12, 0, 0).unwrap();
        match event {
            ExchangeEvent::OrderCompleted { created_at, .. } => assert_eq!(created_at, Some(expected)),
            other => panic!("unexpected event {:?}", other),
        }
    }
}
