//! Exchange feed integration
//!
//! - `events`: wire payloads and their normalization
//! - `handlers`: per-session event name → decoder table
//! - `socketio`: Engine.IO v3 / Socket.IO v2 packet codec
//! - `transport`: the `Transport`/`Session` seam
//! - `websocket`: production transport over tokio-tungstenite

pub mod events;
pub mod handlers;
pub mod socketio;
pub mod transport;
pub mod websocket;

pub use events::EventKind;
pub use handlers::{EventNames, HandlerTable};
pub use transport::{Session, SessionEvent, Transport};
pub use websocket::{KeepAlive, WebSocketSession, WebSocketTransport};
