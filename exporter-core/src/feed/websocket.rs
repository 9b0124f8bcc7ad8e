//! Socket.IO over WebSocket transport
//!
//! `open()` dials the endpoint and waits for the Engine.IO open packet.
//! A background task then owns the socket: it answers server pings, sends
//! the client keep-alive ping every `ping_interval`, and treats a missing
//! pong after `ping_timeout` as a dropped session. Decoded events reach the
//! connection manager over a bounded channel.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep_until, timeout, Instant, MissedTickBehavior};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};

use super::socketio::{self, Handshake, Packet};
use super::transport::{Session, SessionEvent, Transport};
use crate::config::FeedConfig;
use crate::core::TransportError;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Time allowed for a graceful close before the session task is aborted
const CLOSE_GRACE: Duration = Duration::from_secs(2);

/// Client keep-alive settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeepAlive {
    pub ping_interval: Duration,
    pub ping_timeout: Duration,
}

/// Production transport for Socket.IO feeds
#[derive(Debug, Clone)]
pub struct WebSocketTransport {
    url: String,
    keep_alive: KeepAlive,
    connect_timeout: Duration,
    channel_capacity: usize,
}

impl WebSocketTransport {
    pub fn new(url: impl Into<String>, keep_alive: KeepAlive, connect_timeout: Duration) -> Self {
        Self {
            url: url.into(),
            keep_alive,
            connect_timeout,
            channel_capacity: 1024,
        }
    }

    pub fn from_config(config: &FeedConfig) -> Self {
        Self::new(
            config.url.clone(),
            KeepAlive {
                ping_interval: config.ping_interval,
                ping_timeout: config.ping_timeout,
            },
            config.connect_timeout,
        )
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    type Session = WebSocketSession;

    async fn open(&self) -> Result<WebSocketSession, TransportError> {
        let (mut ws, _response) =
            match timeout(self.connect_timeout, connect_async(self.url.as_str())).await {
                Ok(Ok(pair)) => pair,
                Ok(Err(e)) => return Err(TransportError::Connect(e.to_string())),
                Err(_) => return Err(TransportError::Timeout(self.connect_timeout)),
            };

        let handshake = match timeout(self.connect_timeout, read_handshake(&mut ws)).await {
            Ok(result) => result?,
            Err(_) => return Err(TransportError::Timeout(self.connect_timeout)),
        };

        debug!(
            "Engine.IO session {} opened (server ping {}ms/{}ms, using {:?}/{:?})",
            handshake.sid,
            handshake.ping_interval,
            handshake.ping_timeout,
            self.keep_alive.ping_interval,
            self.keep_alive.ping_timeout
        );

        let (events_tx, events_rx) = mpsc::channel(self.channel_capacity);
        let (stop_tx, stop_rx) = oneshot::channel();
        let task = tokio::spawn(drive_session(ws, events_tx, self.keep_alive, stop_rx));

        Ok(WebSocketSession {
            events: events_rx,
            stop: Some(stop_tx),
            task: Some(task),
        })
    }

    fn endpoint(&self) -> &str {
        &self.url
    }
}

/// Live Socket.IO session
pub struct WebSocketSession {
    events: mpsc::Receiver<SessionEvent>,
    stop: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

#[async_trait]
impl Session for WebSocketSession {
    async fn next_event(&mut self) -> Option<SessionEvent> {
        self.events.recv().await
    }

    async fn close(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(mut task) = self.task.take() {
            if timeout(CLOSE_GRACE, &mut task).await.is_err() {
                warn!("Session task did not stop within {:?}, aborting", CLOSE_GRACE);
                task.abort();
            }
        }
        self.events.close();
    }
}

impl Drop for WebSocketSession {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn read_handshake(ws: &mut WsStream) -> Result<Handshake, TransportError> {
    while let Some(frame) = ws.next().await {
        match frame? {
            Message::Text(text) => {
                return match socketio::decode(&text) {
                    Ok(Packet::Open(handshake)) => Ok(handshake),
                    Ok(other) => Err(TransportError::Handshake(format!(
                        "expected open packet, got {:?}",
                        other
                    ))),
                    Err(e) => Err(TransportError::Handshake(e.to_string())),
                };
            }
            Message::Close(_) => return Err(TransportError::StreamEnded),
            _ => continue,
        }
    }
    Err(TransportError::StreamEnded)
}

async fn drive_session(
    ws: WsStream,
    events: mpsc::Sender<SessionEvent>,
    keep_alive: KeepAlive,
    mut stop: oneshot::Receiver<()>,
) {
    let (mut sink, mut stream) = ws.split();
    let mut ping_timer = interval_at(
        Instant::now() + keep_alive.ping_interval,
        keep_alive.ping_interval,
    );
    ping_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut pong_deadline: Option<Instant> = None;

    let reason = loop {
        let deadline = pong_deadline;
        let pong_wait = async move {
            match deadline {
                Some(at) => sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            _ = &mut stop => {
                let _ = sink.send(Message::Text(socketio::DISCONNECT.to_string())).await;
                let _ = sink.close().await;
                return;
            }
            _ = ping_timer.tick() => {
                if pong_deadline.is_none() {
                    if let Err(e) = sink.send(Message::Text(socketio::PING.to_string())).await {
                        break format!("ping failed: {}", e);
                    }
                    pong_deadline = Some(Instant::now() + keep_alive.ping_timeout);
                }
            }
            _ = pong_wait => {
                break format!("no pong within {:?}", keep_alive.ping_timeout);
            }
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => match socketio::decode(&text) {
                    Ok(Packet::Pong) => pong_deadline = None,
                    Ok(Packet::Ping) => {
                        if let Err(e) = sink.send(Message::Text(socketio::PONG.to_string())).await {
                            break format!("pong failed: {}", e);
                        }
                    }
                    Ok(Packet::Connect) => {
                        if events.send(SessionEvent::Connected).await.is_err() {
                            return;
                        }
                    }
                    Ok(Packet::Event { name, payload }) => {
                        if events.send(SessionEvent::Message { name, payload }).await.is_err() {
                            return;
                        }
                    }
                    Ok(Packet::Disconnect) => break "server disconnected".to_string(),
                    Ok(Packet::Close) => break "server closed the engine".to_string(),
                    Ok(Packet::Error(e)) => break format!("server error: {}", e),
                    Ok(Packet::Open(_)) | Ok(Packet::Noop) | Ok(Packet::Ignored) => {}
                    Err(e) => warn!("Dropping undecodable frame: {}", e),
                },
                Some(Ok(Message::Close(frame))) => break format!("close frame {:?}", frame),
                Some(Ok(_)) => {}
                Some(Err(e)) => break format!("websocket error: {}", e),
                None => break "stream ended".to_string(),
            },
        }
    };

    warn!("Session ended: {}", reason);
    let _ = events.send(SessionEvent::Disconnected).await;
}
