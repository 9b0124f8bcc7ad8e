//! Engine.IO v3 / Socket.IO v2 text packet codec
//!
//! Frame layout: one Engine.IO type digit, and for messages (`4`) one
//! Socket.IO type digit followed by an optional namespace (`/nsp,`), an
//! optional ack id and a JSON body.
//!
//! ```text
//! 0{"sid":"abc","pingInterval":25000,"pingTimeout":5000}   open
//! 2 / 3                                                    ping / pong
//! 40                                                       connect
//! 41                                                       disconnect
//! 42["order",{"type":1,"amount":0.1,"unit_price":50000}]   event
//! ```

use serde::Deserialize;
use serde_json::Value;

use crate::core::CodecError;

/// Engine.IO open handshake body
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handshake {
    pub sid: String,
    #[serde(default)]
    pub upgrades: Vec<String>,
    /// Server suggested ping interval (ms)
    #[serde(default)]
    pub ping_interval: u64,
    /// Server suggested ping timeout (ms)
    #[serde(default)]
    pub ping_timeout: u64,
}

/// Decoded text frame
#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    Open(Handshake),
    Close,
    Ping,
    Pong,
    Noop,
    Connect,
    Disconnect,
    Event { name: String, payload: String },
    Error(String),
    /// Valid packet this client has no use for (acks, upgrades, binary)
    Ignored,
}

/// Client keep-alive ping frame
pub const PING: &str = "2";
/// Reply to a server ping
pub const PONG: &str = "3";
/// Socket.IO disconnect frame
pub const DISCONNECT: &str = "41";

/// Decode one text frame
pub fn decode(frame: &str) -> Result<Packet, CodecError> {
    let mut chars = frame.chars();
    let engine_type = chars.next().ok_or(CodecError::Empty)?;
    let rest = chars.as_str();

    match engine_type {
        '0' => Ok(Packet::Open(serde_json::from_str(rest)?)),
        '1' => Ok(Packet::Close),
        '2' => Ok(Packet::Ping),
        '3' => Ok(Packet::Pong),
        '4' => decode_message(rest),
        '5' => Ok(Packet::Ignored),
        '6' => Ok(Packet::Noop),
        other => Err(CodecError::UnknownPacketType(other)),
    }
}

fn decode_message(body: &str) -> Result<Packet, CodecError> {
    let mut chars = body.chars();
    let socket_type = chars
        .next()
        .ok_or_else(|| CodecError::Malformed("message without socket packet type".to_string()))?;
    let rest = chars.as_str();

    match socket_type {
        '0' => Ok(Packet::Connect),
        '1' => Ok(Packet::Disconnect),
        '2' => decode_event(rest),
        '3' | '5' | '6' => Ok(Packet::Ignored),
        '4' => Ok(Packet::Error(strip_namespace(rest).to_string())),
        other => Err(CodecError::UnknownPacketType(other)),
    }
}

fn decode_event(body: &str) -> Result<Packet, CodecError> {
    let body = strip_namespace(body);
    let body = body.trim_start_matches(|c: char| c.is_ascii_digit());

    let value: Value = serde_json::from_str(body)?;
    let mut items = match value {
        Value::Array(items) => items.into_iter(),
        _ => return Err(CodecError::Malformed("event body is not an array".to_string())),
    };

    let name = match items.next() {
        Some(Value::String(name)) => name,
        _ => return Err(CodecError::Malformed("event without a name".to_string())),
    };
    let payload = items.next().unwrap_or(Value::Null).to_string();

    Ok(Packet::Event { name, payload })
}

fn strip_namespace(body: &str) -> &str {
    if body.starts_with('/') {
        match body.find(',') {
            Some(idx) => &body[idx + 1..],
            None => "",
        }
    } else {
        body
    }
}

/// Encode a named event frame
pub fn encode_event(name: &str, payload: &Value) -> String {
    format!("42{}", Value::Array(vec![Value::String(name.to_string()), payload.clone()]))
}
