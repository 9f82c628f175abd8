//! Wire frames exchanged with a device over its live socket.
//!
//! Every frame is a small JSON object with a `type` tag and an optional
//! `value`:
//!
//! ```text
//! -> {"type": "login", "value": ""}
//! -> {"type": "state", "value": 1}
//! <- {"type": "state", "value": 0.5}
//! <- {"type": "device_reset"}
//! ```

use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::error::Error;

// ── Outbound ─────────────────────────────────────────────────────────

/// Target value carried by an outbound `state` frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StateValue {
    /// `1`
    On,
    /// `0`
    Off,
    /// `-1`, the device flips its current state.
    Toggle,
    /// Brightness fraction in `[0, 1]`.
    Level(f64),
}

impl Serialize for StateValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::On => serializer.serialize_i64(1),
            Self::Off => serializer.serialize_i64(0),
            Self::Toggle => serializer.serialize_i64(-1),
            Self::Level(level) => serializer.serialize_f64(*level),
        }
    }
}

/// A frame sent from us to the device.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum OutboundFrame {
    Login(String),
    State(StateValue),
}

impl OutboundFrame {
    /// The static login frame sent right after connecting.
    pub fn login() -> Self {
        Self::Login(String::new())
    }

    pub fn state(value: StateValue) -> Self {
        Self::State(value)
    }

    /// Serialize to the JSON text carried in a WebSocket text frame.
    pub fn encode(&self) -> Result<String, Error> {
        Ok(serde_json::to_string(self)?)
    }
}

// ── Inbound ──────────────────────────────────────────────────────────

/// A frame received from the device, reduced to what the session acts on.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    /// Current output level: `0` is off, anything else is on
    /// (lights report a brightness fraction).
    State(f64),
    /// The device was factory reset and wants to be forgotten.
    DeviceReset,
    /// Unknown or missing `type`; carries the tag when there was one.
    Ignored(Option<String>),
}

/// Parse the JSON text of an inbound frame.
///
/// Unknown message types are not an error -- they come back as
/// [`InboundMessage::Ignored`]. Only a payload that is not a JSON object,
/// or a `state` frame with a non-numeric value, fails.
pub fn parse_inbound(text: &str) -> Result<InboundMessage, Error> {
    let raw: Value = serde_json::from_str(text).map_err(|e| Error::MalformedFrame {
        message: e.to_string(),
        body: text.to_owned(),
    })?;

    let Value::Object(fields) = raw else {
        return Err(Error::MalformedFrame {
            message: "expected a JSON object".into(),
            body: text.to_owned(),
        });
    };

    match fields.get("type").and_then(Value::as_str) {
        Some("device_reset") => Ok(InboundMessage::DeviceReset),
        Some("state") => decode_state_value(fields.get("value")).map(InboundMessage::State),
        other => Ok(InboundMessage::Ignored(other.map(str::to_owned))),
    }
}

/// Decode the `value` of a `state` frame.
///
/// A missing value reads as `0`; an explicit `null` is invalid. Numeric
/// strings and booleans are accepted too.
fn decode_state_value(value: Option<&Value>) -> Result<f64, Error> {
    let decoded = match value {
        None => Some(0.0),
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::Bool(b)) => Some(if *b { 1.0 } else { 0.0 }),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(_) => None,
    };

    match decoded {
        Some(v) if v.is_finite() => Ok(v),
        _ => Err(Error::InvalidValue {
            value: value.map_or_else(|| "null".into(), Value::to_string),
        }),
    }
}
