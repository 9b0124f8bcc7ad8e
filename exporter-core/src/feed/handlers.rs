//! Per-session handler table
//!
//! Maps upstream event names to the exchange event variant they decode
//! into. A fresh table is registered for every session; registration
//! failures mean the configured event names do not match the protocol and
//! are never retried.

use std::collections::HashMap;

use super::events::EventKind;
use crate::core::{DecodeError, ExchangeEvent, SetupError};

/// Lifecycle event names owned by the transport
pub const RESERVED_EVENTS: &[&str] = &["connect", "connection", "disconnect", "disconnection", "error"];

/// Upstream event names for each exchange event variant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventNames {
    pub order_created: String,
    pub order_canceled: String,
    pub order_completed: String,
}

impl Default for EventNames {
    fn default() -> Self {
        Self {
            order_created: "order".to_string(),
            order_canceled: "cancel_order".to_string(),
            order_completed: "order_completed".to_string(),
        }
    }
}

/// Registered handlers of one session
#[derive(Debug, Clone, Default)]
pub struct HandlerTable {
    handlers: HashMap<String, EventKind>,
}

impl HandlerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every configured exchange event
    pub fn from_names(names: &EventNames) -> Result<Self, SetupError> {
        let mut table = Self::new();
        table.register(&names.order_created, EventKind::OrderCreated)?;
        table.register(&names.order_canceled, EventKind::OrderCanceled)?;
        table.register(&names.order_completed, EventKind::OrderCompleted)?;
        Ok(table)
    }

    /// Listen for `event`, decoding its payload as `kind`
    pub fn register(&mut self, event: &str, kind: EventKind) -> Result<(), SetupError> {
        if event.is_empty() {
            return Err(SetupError::EmptyEventName);
        }
        if RESERVED_EVENTS.contains(&event) {
            return Err(SetupError::ReservedEvent(event.to_string()));
        }
        if self.handlers.contains_key(event) {
            return Err(SetupError::DuplicateHandler(event.to_string()));
        }

        self.handlers.insert(event.to_string(), kind);
        Ok(())
    }

    /// Decode a named payload.
    ///
    /// Returns `Ok(None)` for events nobody listens to.
    pub fn dispatch(&self, event: &str, payload: &str) -> Result<Option<ExchangeEvent>, DecodeError> {
        match self.handlers.get(event) {
            Some(kind) => kind.decode(event, payload).map(Some),
            None => Ok(None),
        }
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Operation;

    #[test]
    fn test_default_names_register() {
        let table = HandlerTable::from_names(&EventNames::default()).unwrap();
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn test_duplicate_name_is_setup_error() {
        let names = EventNames {
            order_created: "order".to_string(),
            order_canceled: "order".to_string(),
            order_completed: "order_completed".to_string(),
        };
        assert_eq!(
            HandlerTable::from_names(&names).unwrap_err(),
            SetupError::DuplicateHandler("order".to_string())
        );
    }

    #[test]
    fn test_reserved_and_empty_names_rejected() {
        let mut table = HandlerTable::new();
        assert_eq!(
            table.register("disconnect", EventKind::OrderCreated),
            Err(SetupError::ReservedEvent("disconnect".to_string()))
        );
        assert_eq!(
            table.register("", EventKind::OrderCreated),
            Err(SetupError::EmptyEventName)
        );
        assert!(table.is_empty());
    }

    #[test]
    fn test_dispatch_known_and_unknown_events() {
        let table = HandlerTable::from_names(&EventNames::default()).unwrap();

        let event = table
            .dispatch("cancel_order", r#"{"type":2,"amount":1,"unit_price":2}"#)
            .unwrap()
            .unwrap();
        assert_eq!(event.operation(), Operation::Ask);

        assert!(table.dispatch("market_summary", "{}").unwrap().is_none());
        assert!(table.dispatch("order", "{oops").is_err());
    }
}
