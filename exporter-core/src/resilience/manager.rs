//! Connection manager with automatic reconnection
//!
//! Keeps one logical subscription to an exchange feed alive across an
//! unreliable transport. The loop matches on the connection state machine:
//! open a session, register handlers, wait for the upstream to confirm,
//! forward every event into the metric model, and on any drop release the
//! session before waiting out the fixed retry delay.
//!
//! Transport and payload errors are recovered here and only show up in
//! logs. Handler registration errors end the loop with an error.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, warn};

use super::backoff::FixedBackoff;
use crate::config::FeedConfig;
use crate::core::{ConnectionFsm, ConnectionState, FeedError, MarketLabels, Transition};
use crate::feed::{EventNames, HandlerTable, Session, SessionEvent, Transport};
use crate::monitoring::ExchangeMetrics;
use crate::utils::shutdown::{is_shutdown_requested, wait_for_shutdown};

/// Ingestion counters, reported in logs and returned on shutdown
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestStats {
    /// Sessions confirmed by the upstream
    pub sessions_established: u64,
    /// Events applied to the metric model
    pub events_applied: u64,
    /// Events dropped because their payload did not decode
    pub events_dropped: u64,
    /// Events nobody listens to
    pub events_ignored: u64,
}

/// The single live session and the handlers registered on it
struct LiveSession<S> {
    session: S,
    handlers: HandlerTable,
}

enum Attempt<S> {
    Established(LiveSession<S>),
    Failed,
    Cancelled,
}

enum Establishment {
    Confirmed,
    Failed(String),
    Cancelled,
}

enum SessionEnd {
    Dropped,
    Shutdown,
}

/// Drives one feed subscription for the lifetime of the process
pub struct ConnectionManager<T: Transport> {
    transport: T,
    metrics: Arc<ExchangeMetrics>,
    market: MarketLabels,
    events: EventNames,
    connect_timeout: Duration,
    backoff: FixedBackoff,
    fsm: ConnectionFsm,
    stats: IngestStats,
}

impl<T: Transport> ConnectionManager<T> {
    pub fn new(transport: T, config: &FeedConfig, metrics: Arc<ExchangeMetrics>) -> Self {
        Self {
            transport,
            metrics,
            market: config.market.clone(),
            events: config.events.clone(),
            connect_timeout: config.connect_timeout,
            backoff: FixedBackoff::new(config.retry_delay),
            fsm: ConnectionFsm::new(config.name()),
            stats: IngestStats::default(),
        }
    }

    /// Current connection state
    pub fn state(&self) -> ConnectionState {
        self.fsm.state()
    }

    /// Run the reconnect loop until `shutdown` flips to `true`.
    ///
    /// If the shutdown sender is dropped the loop keeps running.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> Result<IngestStats, FeedError> {
        let mut live: Option<LiveSession<T::Session>> = None;

        loop {
            match self.fsm.state() {
                ConnectionState::Disconnected => {
                    if is_shutdown_requested(&shutdown) {
                        self.fsm.apply(Transition::Shutdown)?;
                    } else {
                        self.fsm.apply(Transition::Connect)?;
                    }
                }

                ConnectionState::Connecting => match self.connect(&mut shutdown).await? {
                    Attempt::Established(session) => {
                        live = Some(session);
                        self.fsm.apply(Transition::Established)?;
                        self.backoff.reset();
                        self.stats.sessions_established += 1;
                        info!(
                            "Successfully connected to {} (attempt #{})",
                            self.market,
                            self.fsm.data().connect_attempts
                        );
                    }
                    Attempt::Failed => {
                        self.fsm.apply(Transition::HandshakeFailed)?;
                    }
                    Attempt::Cancelled => {
                        self.fsm.apply(Transition::Shutdown)?;
                    }
                },

                ConnectionState::Connected => {
                    let end = match live.as_mut() {
                        Some(session) => self.pump(session, &mut shutdown).await,
                        None => SessionEnd::Dropped,
                    };

                    // Free resources allocated by the previous connection
                    if let Some(mut session) = live.take() {
                        session.session.close().await;
                    }

                    match end {
                        SessionEnd::Dropped => {
                            self.fsm.apply(Transition::Dropped)?;
                        }
                        SessionEnd::Shutdown => {
                            self.fsm.apply(Transition::Shutdown)?;
                        }
                    }
                }

                ConnectionState::RetryBackoff => {
                    let delay = self.backoff.next_delay();
                    info!(
                        "Reconnecting to {} in {:?} (retry #{})",
                        self.market,
                        delay,
                        self.backoff.attempt_number()
                    );

                    let cancelled = tokio::select! {
                        _ = sleep(delay) => false,
                        _ = wait_for_shutdown(&mut shutdown) => true,
                    };

                    if cancelled {
                        self.fsm.apply(Transition::Shutdown)?;
                    } else {
                        self.fsm.apply(Transition::BackoffElapsed)?;
                    }
                }

                ConnectionState::Stopped => {
                    info!(
                        "Stopped feed {} (applied: {}, dropped: {}, sessions: {})",
                        self.market,
                        self.stats.events_applied,
                        self.stats.events_dropped,
                        self.stats.sessions_established
                    );
                    return Ok(self.stats);
                }
            }
        }
    }

    /// Open a session, register handlers and wait for the upstream to confirm
    async fn connect(
        &mut self,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<Attempt<T::Session>, FeedError> {
        debug!("Connecting to {}", self.transport.endpoint());

        let opened = tokio::select! {
            result = self.transport.open() => Some(result),
            _ = wait_for_shutdown(shutdown) => None,
        };

        let mut session = match opened {
            Some(Ok(session)) => session,
            Some(Err(e)) => {
                error!("Error connecting to {}: {}", self.transport.endpoint(), e);
                return Ok(Attempt::Failed);
            }
            None => return Ok(Attempt::Cancelled),
        };

        let handlers = match HandlerTable::from_names(&self.events) {
            Ok(handlers) => handlers,
            Err(e) => {
                error!("Cannot listen for {} messages: {}", self.market, e);
                session.close().await;
                return Err(e.into());
            }
        };

        let connect_timeout = self.connect_timeout;
        let establishment = tokio::select! {
            result = timeout(connect_timeout, self.await_established(&mut session, &handlers)) => {
                match result {
                    Ok(true) => Establishment::Confirmed,
                    Ok(false) => Establishment::Failed("session ended before it was confirmed".to_string()),
                    Err(_) => Establishment::Failed(format!("not confirmed within {:?}", connect_timeout)),
                }
            }
            _ = wait_for_shutdown(shutdown) => Establishment::Cancelled,
        };

        match establishment {
            Establishment::Confirmed => Ok(Attempt::Established(LiveSession { session, handlers })),
            Establishment::Failed(reason) => {
                error!("Error connecting to {}: {}", self.transport.endpoint(), reason);
                session.close().await;
                Ok(Attempt::Failed)
            }
            Establishment::Cancelled => {
                session.close().await;
                Ok(Attempt::Cancelled)
            }
        }
    }

    async fn await_established(&mut self, session: &mut T::Session, handlers: &HandlerTable) -> bool {
        loop {
            match session.next_event().await {
                Some(SessionEvent::Connected) => return true,
                Some(SessionEvent::Disconnected) | None => return false,
                Some(SessionEvent::Message { name, payload }) => {
                    self.handle_message(handlers, &name, &payload);
                }
            }
        }
    }

    /// Forward session events until the session drops or shutdown is requested
    async fn pump(
        &mut self,
        live: &mut LiveSession<T::Session>,
        shutdown: &mut watch::Receiver<bool>,
    ) -> SessionEnd {
        loop {
            let next = tokio::select! {
                event = live.session.next_event() => Some(event),
                _ = wait_for_shutdown(shutdown) => None,
            };

            match next {
                None => return SessionEnd::Shutdown,
                Some(None) | Some(Some(SessionEvent::Disconnected)) => {
                    warn!("Disconnected from {}, reconnecting", self.market);
                    return SessionEnd::Dropped;
                }
                Some(Some(SessionEvent::Connected)) => {
                    debug!("Ignoring repeated connect signal from {}", self.market);
                }
                Some(Some(SessionEvent::Message { name, payload })) => {
                    self.handle_message(&live.handlers, &name, &payload);
                }
            }
        }
    }

    fn handle_message(&mut self, handlers: &HandlerTable, name: &str, payload: &str) {
        match handlers.dispatch(name, payload) {
            Ok(Some(event)) => {
                debug!("Received {} message: {:?}", name, event);
                self.metrics.apply(&self.market, &event);
                self.stats.events_applied += 1;
            }
            Ok(None) => {
                debug!("Ignoring unhandled '{}' message", name);
                self.stats.events_ignored += 1;
            }
            Err(e) => {
                warn!("Dropping {} message: {}", self.market, e);
                self.stats.events_dropped += 1;
            }
        }
    }
}
