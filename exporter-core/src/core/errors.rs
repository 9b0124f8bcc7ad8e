//! Domain-specific error types for the exporter
//!
//! The taxonomy follows how each failure is handled:
//! - `TransportError`: connection refused, handshake failure, dropped stream.
//!   Recovered by the connection manager through a retry.
//! - `DecodeError` / `CodecError`: one bad payload or frame. Logged and dropped.
//! - `SetupError` / `InvalidTransition`: programming or configuration mistakes.
//!   Propagated out of the manager and fatal to the process.

use std::time::Duration;
use thiserror::Error;

use super::connection_fsm::{ConnectionState, Transition};

/// Failures opening or keeping a streaming session
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("websocket connection failed: {0}")]
    Connect(String),

    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("handshake timed out after {0:?}")]
    Timeout(Duration),

    #[error("handshake failed: {0}")]
    Handshake(String),

    #[error("stream ended during handshake")]
    StreamEnded,
}

/// A named event payload that could not be decoded
#[derive(Debug, Error)]
#[error("malformed '{event}' payload: {source}")]
pub struct DecodeError {
    /// Upstream event name
    pub event: String,
    #[source]
    pub source: serde_json::Error,
}

/// A Socket.IO text frame that could not be decoded
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("empty frame")]
    Empty,

    #[error("unknown packet type '{0}'")]
    UnknownPacketType(char),

    #[error("malformed packet: {0}")]
    Malformed(String),

    #[error("invalid packet json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Handler registration failure on a fresh session
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SetupError {
    #[error("cannot listen for an event with an empty name")]
    EmptyEventName,

    #[error("cannot listen for reserved lifecycle event '{0}'")]
    ReservedEvent(String),

    #[error("a handler for '{0}' is already registered")]
    DuplicateHandler(String),
}

/// Transition not allowed by the connection state machine
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid connection transition {transition:?} from state {from:?}")]
pub struct InvalidTransition {
    pub from: ConnectionState,
    pub transition: Transition,
}

/// Invalid feed configuration
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid feed url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("label '{0}' must not be empty")]
    EmptyLabel(&'static str),

    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),
}

/// Unrecoverable connection manager failure
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("handler registration failed: {0}")]
    Setup(#[from] SetupError),

    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),
}
