//! Transport seam between the connection manager and the wire
//!
//! A [`Transport`] opens sessions; a [`Session`] yields already-deframed
//! [`SessionEvent`]s in delivery order. The manager owns at most one
//! session at a time and always calls [`Session::close`] before opening the
//! next one.

use async_trait::async_trait;

use crate::core::TransportError;

/// One message handed from a session to the connection manager
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Upstream confirmed the session
    Connected,
    /// Upstream dropped the session (explicitly or by keep-alive timeout)
    Disconnected,
    /// Named event with its raw JSON payload
    Message { name: String, payload: String },
}

impl SessionEvent {
    pub fn message(name: impl Into<String>, payload: impl Into<String>) -> Self {
        SessionEvent::Message {
            name: name.into(),
            payload: payload.into(),
        }
    }
}

/// Opens streaming sessions to one upstream feed
#[async_trait]
pub trait Transport: Send + Sync {
    type Session: Session;

    /// Open the stream and complete the transport handshake
    async fn open(&self) -> Result<Self::Session, TransportError>;

    /// Human-readable endpoint for logs
    fn endpoint(&self) -> &str;
}

/// A live streaming session
#[async_trait]
pub trait Session: Send {
    /// Next event, or `None` once the session has ended
    async fn next_event(&mut self) -> Option<SessionEvent>;

    /// Release transport resources. Must be idempotent.
    async fn close(&mut self);
}
