//! Core domain types for the exporter
//!
//! This module provides the building blocks shared by the feed and the
//! metric model:
//! - `Operation`, `OrderEventKind`, `ExchangeEvent`, `MarketLabels`
//! - The connection lifecycle state machine
//! - Error types

pub mod connection_fsm;
pub mod errors;
pub mod types;

// Re-export commonly used types
pub use connection_fsm::{ConnectionFsm, ConnectionState, Transition};
pub use errors::{
    CodecError, ConfigError, DecodeError, FeedError, InvalidTransition, SetupError,
    TransportError,
};
pub use types::{ExchangeEvent, MarketLabels, Operation, OrderEventKind};
