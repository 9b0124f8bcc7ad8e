//! Connection State Machine
//!
//! Explicit finite state machine for the lifecycle of one logical feed
//! subscription. The connection manager's loop matches on the current
//! state; every state change goes through [`ConnectionFsm::apply`], which
//! rejects transitions the diagram does not allow.
//!
//! # State Diagram
//!
//! ```text
//!     DISCONNECTED ◄──────backoff_elapsed()──────┐
//!           │                                    │
//!       connect()                                │
//!           ▼                                    │
//!      CONNECTING ──handshake_failed()──→ RETRY_BACKOFF
//!           │                                    ▲
//!     established()                              │
//!           ▼                                    │
//!      CONNECTED ────────dropped()───────────────┘
//!
//!   any non-terminal state ──shutdown()──→ STOPPED
//! ```
//!
//! **Key Features:**
//! - Session cleanup happens before entering `RetryBackoff` or `Stopped`
//! - `Stopped` is terminal
//! - Attempt and disconnect counters are kept for logging only
//!
//! # Usage
//!
//! ```
//! use exporter_core::core::connection_fsm::*;
//!
//! let mut fsm = ConnectionFsm::new("bitcointrade");
//! fsm.apply(Transition::Connect).unwrap();
//! fsm.apply(Transition::Established).unwrap();
//! assert_eq!(fsm.state(), ConnectionState::Connected);
//!
//! fsm.apply(Transition::Dropped).unwrap();
//! assert_eq!(fsm.state(), ConnectionState::RetryBackoff);
//! ```

use std::time::SystemTime;

use super::errors::InvalidTransition;

/// Named connection states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// No session; about to (re)connect
    Disconnected,
    /// Session opened, waiting for the upstream to confirm establishment
    Connecting,
    /// Session live, events flowing
    Connected,
    /// Session released, waiting for the fixed retry delay
    RetryBackoff,
    /// Terminal, only on explicit shutdown
    Stopped,
}

impl ConnectionState {
    /// Check if operational
    pub fn is_operational(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }

    /// Check if terminal
    pub fn is_terminal(&self) -> bool {
        matches!(self, ConnectionState::Stopped)
    }

    /// Get state name
    pub fn state_name(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "Disconnected",
            ConnectionState::Connecting => "Connecting",
            ConnectionState::Connected => "Connected",
            ConnectionState::RetryBackoff => "RetryBackoff",
            ConnectionState::Stopped => "Stopped",
        }
    }

    /// Compute the next state, or `None` if the transition is not allowed
    pub fn next(self, transition: Transition) -> Option<ConnectionState> {
        use ConnectionState::*;
        use Transition::*;

        match (self, transition) {
            (Disconnected, Connect) => Some(Connecting),
            (Connecting, Established) => Some(Connected),
            (Connecting, HandshakeFailed) => Some(RetryBackoff),
            (Connected, Dropped) => Some(RetryBackoff),
            (RetryBackoff, BackoffElapsed) => Some(Disconnected),
            (Stopped, _) => None,
            (_, Shutdown) => Some(Stopped),
            _ => None,
        }
    }
}

/// Events that move the state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transition {
    /// Loop entry or backoff expired: start a new attempt
    Connect,
    /// Transport handshake succeeded and the upstream confirmed the session
    Established,
    /// Opening or authenticating the stream failed
    HandshakeFailed,
    /// Upstream signalled disconnection while connected
    Dropped,
    /// Fixed retry delay has passed
    BackoffElapsed,
    /// Explicit shutdown request
    Shutdown,
}

/// Bookkeeping for one logical subscription (log context only)
#[derive(Debug, Clone)]
pub struct ConnectionData {
    /// Connection name/identifier
    pub name: String,
    /// Timestamp when the state machine was created
    pub created_at: SystemTime,
    /// Timestamp when last connected
    pub last_connected_at: Option<SystemTime>,
    /// Timestamp when last disconnected
    pub last_disconnected_at: Option<SystemTime>,
    /// Total number of dropped sessions
    pub disconnect_count: u64,
    /// Total number of connection attempts
    pub connect_attempts: u64,
    /// Consecutive failed attempts since the last established session
    pub consecutive_failures: u32,
}

impl ConnectionData {
    pub fn new(name: String) -> Self {
        Self {
            name,
            created_at: SystemTime::now(),
            last_connected_at: None,
            last_disconnected_at: None,
            disconnect_count: 0,
            connect_attempts: 0,
            consecutive_failures: 0,
        }
    }
}

/// Connection state machine with its bookkeeping
#[derive(Debug, Clone)]
pub struct ConnectionFsm {
    state: ConnectionState,
    data: ConnectionData,
}

impl ConnectionFsm {
    /// Create a new state machine in `Disconnected`
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            data: ConnectionData::new(name.into()),
        }
    }

    /// Current state
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Access the underlying data
    pub fn data(&self) -> &ConnectionData {
        &self.data
    }

    /// Apply a transition, updating bookkeeping on success
    pub fn apply(&mut self, transition: Transition) -> Result<ConnectionState, InvalidTransition> {
        let next = self.state.next(transition).ok_or(InvalidTransition {
            from: self.state,
            transition,
        })?;

        match transition {
            Transition::Connect => {
                self.data.connect_attempts += 1;
            }
            Transition::Established => {
                self.data.last_connected_at = Some(SystemTime::now());
                self.data.consecutive_failures = 0;
            }
            Transition::HandshakeFailed => {
                self.data.consecutive_failures = self.data.consecutive_failures.saturating_add(1);
            }
            Transition::Dropped => {
                self.data.last_disconnected_at = Some(SystemTime::now());
                self.data.disconnect_count += 1;
            }
            Transition::BackoffElapsed | Transition::Shutdown => {}
        }

        self.state = next;
        Ok(next)
    }
}
