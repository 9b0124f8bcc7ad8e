//! Testing utilities for unit and integration tests
//!
//! - `ScriptedTransport`: programmable feed transport
//! - Payload builders and polling helpers

pub mod helpers;
pub mod mock_transport;

pub use helpers::*;
pub use mock_transport::{ScriptedAttempt, ScriptedSession, ScriptedTransport};
