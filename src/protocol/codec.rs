//! Two-layer text framing for the socket.io wire protocol.
//!
//! Every WebSocket text message is one transport frame whose first character
//! selects its kind. Message frames (`4`) wrap a second layer whose first
//! character selects the packet kind; event packets (`2`) carry a JSON array
//! `[name, fields?]`.
//!
//! | Raw text         | Decoded as                          |
//! |------------------|-------------------------------------|
//! | `0{...}`         | [`Frame::Open`]                     |
//! | `1`              | [`Frame::Close`]                    |
//! | `2`              | [`Frame::Ping`] (answer with `3`)   |
//! | `3`              | [`Frame::Pong`]                     |
//! | `4...`           | [`Frame::Message`] → [`Packet`]     |
//! | *(anything else)*| `None`, silently ignored            |
//!
//! Decoding stays minimal: the client only ever receives `execute_command`
//! and only ever sends `output_from_client`.

use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::{AppError, Result};

/// Frame written immediately after dialing: message + packet connect.
pub const CONNECT_FRAME: &str = "40";

/// Reply to an inbound ping.
pub const PONG_FRAME: &str = "3";

/// Prefix of an outbound event frame: message + packet event.
pub const EVENT_PREFIX: &str = "42";

/// Inbound event carrying a command to execute.
pub const EXECUTE_EVENT: &str = "execute_command";

/// Outbound event carrying console output.
pub const OUTPUT_EVENT: &str = "output_from_client";

/// Transport-level frame, selected by the first character.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Handshake from the server; payload is the session descriptor.
    Open(String),
    /// Server is closing the transport.
    Close,
    /// Liveness probe.
    Ping,
    /// Liveness reply.
    Pong,
    /// Message envelope; payload is a socket.io packet.
    Message(String),
}

/// Packet carried by a [`Frame::Message`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    /// Namespace connect acknowledgment.
    Connect,
    /// Namespace disconnect.
    Disconnect,
    /// Event; payload is the raw JSON array text.
    Event(String),
    /// Namespace connect refused; payload is the server's reason.
    ConnectError(String),
}

/// Decoded application event.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Event name (array element 0).
    pub name: String,
    /// Remaining array elements, in order.
    pub args: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct ExecuteFields {
    command: String,
}

impl Event {
    /// Named fields carried in the first argument, when it is an object.
    #[must_use]
    pub fn fields(&self) -> Option<&Map<String, Value>> {
        self.args.first().and_then(Value::as_object)
    }

    /// String value of one named field.
    #[must_use]
    pub fn field_str(&self, key: &str) -> Option<&str> {
        self.fields()?.get(key)?.as_str()
    }

    /// Command text when this is an `execute_command` event with a string
    /// `command` field; `None` for every other event.
    #[must_use]
    pub fn execute_command(&self) -> Option<String> {
        if self.name != EXECUTE_EVENT {
            return None;
        }
        let first = self.args.first()?.clone();
        serde_json::from_value::<ExecuteFields>(first)
            .ok()
            .map(|fields| fields.command)
    }
}

/// Decode one transport frame.
///
/// Returns `None` for empty input and for leading characters this client
/// does not act on (upgrade, noop, unknown).
#[must_use]
pub fn decode_frame(raw: &str) -> Option<Frame> {
    let mut chars = raw.chars();
    let kind = chars.next()?;
    let rest = chars.as_str();

    match kind {
        '0' => Some(Frame::Open(rest.to_owned())),
        '1' => Some(Frame::Close),
        '2' => Some(Frame::Ping),
        '3' => Some(Frame::Pong),
        '4' => Some(Frame::Message(rest.to_owned())),
        _ => None,
    }
}

/// Decode the packet inside a message frame.
///
/// Returns `None` for empty input and packet kinds the client ignores
/// (acks, binary events).
#[must_use]
pub fn decode_packet(data: &str) -> Option<Packet> {
    let mut chars = data.chars();
    let kind = chars.next()?;
    let rest = chars.as_str();

    match kind {
        '0' => Some(Packet::Connect),
        '1' => Some(Packet::Disconnect),
        '2' => Some(Packet::Event(rest.to_owned())),
        '4' => Some(Packet::ConnectError(rest.to_owned())),
        _ => None,
    }
}

/// Parse an event packet payload.
///
/// # Return value
///
/// - `Ok(Some(event))`: a JSON array whose first element is a string.
/// - `Ok(None)`: an empty array, or a first element that is not a string.
///
/// # Errors
///
/// Returns [`AppError::Codec`] when the payload is not a JSON array.
pub fn decode_event(payload: &str) -> Result<Option<Event>> {
    let mut items: Vec<Value> = serde_json::from_str(payload)
        .map_err(|err| AppError::Codec(format!("malformed event: {err}")))?;

    if items.is_empty() {
        return Ok(None);
    }

    let Value::String(name) = items.remove(0) else {
        return Ok(None);
    };

    Ok(Some(Event { name, args: items }))
}

/// Decode a whole raw text frame down to an event, if it carries one.
///
/// # Errors
///
/// Returns [`AppError::Codec`] when an event packet has a malformed payload.
pub fn decode_event_frame(raw: &str) -> Result<Option<Event>> {
    let Some(Frame::Message(data)) = decode_frame(raw) else {
        return Ok(None);
    };
    let Some(Packet::Event(payload)) = decode_packet(&data) else {
        return Ok(None);
    };
    decode_event(&payload)
}

/// Encode an outbound event frame: `42["name",{fields}]`.
#[must_use]
pub fn encode_event(name: &str, fields: Value) -> String {
    format!("{EVENT_PREFIX}{}", json!([name, fields]))
}

/// Encode an `output_from_client` event carrying `output`.
#[must_use]
pub fn encode_output(output: &str) -> String {
    encode_event(OUTPUT_EVENT, json!({ "output": output }))
}
