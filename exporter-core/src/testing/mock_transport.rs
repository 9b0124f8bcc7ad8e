//! Scripted transport for driving the connection manager in tests
//!
//! Each call to `open` consumes the next scripted attempt: either a refusal
//! or a session that yields a fixed list of events. Once the script is
//! exhausted, `open` returns sessions that stay silent until closed.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::core::TransportError;
use crate::feed::{Session, SessionEvent, Transport};

/// One scripted outcome of `Transport::open`
#[derive(Debug, Clone)]
pub enum ScriptedAttempt {
    /// `open` fails with a connect error
    Refuse(String),
    /// `open` succeeds; the session yields `events` and then either ends
    /// or, with `hold_open`, stays silent until closed
    Session {
        events: Vec<SessionEvent>,
        hold_open: bool,
    },
}

#[derive(Default)]
struct ScriptState {
    attempts: Mutex<VecDeque<ScriptedAttempt>>,
    open_calls: AtomicUsize,
    opened: AtomicUsize,
    closed: AtomicUsize,
    live: AtomicUsize,
    max_live: AtomicUsize,
}

/// Programmable `Transport`; clones share the same script and counters
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    state: Arc<ScriptState>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an arbitrary attempt
    pub fn push(&self, attempt: ScriptedAttempt) -> &Self {
        self.state.attempts.lock().push_back(attempt);
        self
    }

    /// Queue a refused connection
    pub fn refuse(&self, reason: &str) -> &Self {
        self.push(ScriptedAttempt::Refuse(reason.to_string()))
    }

    /// Queue a session that ends after its events
    pub fn session(&self, events: Vec<SessionEvent>) -> &Self {
        self.push(ScriptedAttempt::Session {
            events,
            hold_open: false,
        })
    }

    /// Queue a session that stays open after its events
    pub fn session_held_open(&self, events: Vec<SessionEvent>) -> &Self {
        self.push(ScriptedAttempt::Session {
            events,
            hold_open: true,
        })
    }

    /// Number of `open` calls, refused ones included
    pub fn open_calls(&self) -> usize {
        self.state.open_calls.load(Ordering::SeqCst)
    }

    /// Sessions handed out
    pub fn opened(&self) -> usize {
        self.state.opened.load(Ordering::SeqCst)
    }

    /// Sessions closed
    pub fn closed(&self) -> usize {
        self.state.closed.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneously open sessions observed
    pub fn max_live(&self) -> usize {
        self.state.max_live.load(Ordering::SeqCst)
    }

    /// Scripted attempts not consumed yet
    pub fn remaining(&self) -> usize {
        self.state.attempts.lock().len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    type Session = ScriptedSession;

    async fn open(&self) -> Result<ScriptedSession, TransportError> {
        self.state.open_calls.fetch_add(1, Ordering::SeqCst);

        let attempt = self.state.attempts.lock().pop_front();
        let (events, hold_open) = match attempt {
            Some(ScriptedAttempt::Refuse(reason)) => return Err(TransportError::Connect(reason)),
            Some(ScriptedAttempt::Session { events, hold_open }) => (events, hold_open),
            None => (Vec::new(), true),
        };

        self.state.opened.fetch_add(1, Ordering::SeqCst);
        let live = self.state.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.max_live.fetch_max(live, Ordering::SeqCst);

        Ok(ScriptedSession {
            events: events.into(),
            hold_open,
            closed: false,
            state: self.state.clone(),
        })
    }

    fn endpoint(&self) -> &str {
        "scripted://feed"
    }
}

/// Session produced by [`ScriptedTransport`]
pub struct ScriptedSession {
    events: VecDeque<SessionEvent>,
    hold_open: bool,
    closed: bool,
    state: Arc<ScriptState>,
}

#[async_trait]
impl Session for ScriptedSession {
    async fn next_event(&mut self) -> Option<SessionEvent> {
        if self.closed {
            return None;
        }

        if let Some(event) = self.events.pop_front() {
            // Let other tasks (scrapes, shutdown) interleave with delivery
            tokio::task::yield_now().await;
            return Some(event);
        }

        if self.hold_open {
            std::future::pending::<()>().await;
        }
        None
    }

    async fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.state.closed.fetch_add(1, Ordering::SeqCst);
            self.state.live.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_script_order() {
        let transport = ScriptedTransport::new();
        transport
            .refuse("down")
            .session(vec![SessionEvent::Connected, SessionEvent::Disconnected]);

        assert!(matches!(transport.open().await, Err(TransportError::Connect(_))));

        let mut session = transport.open().await.unwrap();
        assert_eq!(session.next_event().await, Some(SessionEvent::Connected));
        assert_eq!(session.next_event().await, Some(SessionEvent::Disconnected));
        assert_eq!(session.next_event().await, None);

        session.close().await;
        session.close().await;
        assert_eq!(transport.open_calls(), 2);
        assert_eq!(transport.opened(), 1);
        assert_eq!(transport.closed(), 1);
        assert_eq!(transport.remaining(), 0);
    }

    #[tokio::test]
    async fn test_live_session_accounting() {
        let transport = ScriptedTransport::new();
        let mut first = transport.open().await.unwrap();
        let mut second = transport.open().await.unwrap();
        first.close().await;
        second.close().await;

        assert_eq!(transport.max_live(), 2);
        assert_eq!(transport.opened(), transport.closed());
    }
}
