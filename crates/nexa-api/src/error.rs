use thiserror::Error;

/// Close code reported when the connection dropped without a close frame.
pub const ABNORMAL_CLOSE_CODE: u16 = 1006;

/// Top-level error type for the `nexa-api` crate.
///
/// Covers the transport (WebSocket connect, send, receive) and the wire
/// protocol (frame parsing and value decoding). `nexa-core` maps these
/// into domain errors.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// Opening the WebSocket failed (refused, DNS, handshake).
    #[error("WebSocket connection failed: {0}")]
    WebSocketConnect(String),

    /// The connection is closed; nothing more can be sent on it.
    #[error("WebSocket closed (code {code}): {reason}")]
    WebSocketClosed { code: u16, reason: String },

    /// Any other WebSocket failure on a live connection.
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// Endpoint could not be turned into a URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ── Protocol ────────────────────────────────────────────────────
    /// Frame is not a JSON object, with the raw body for debugging.
    #[error("Malformed frame: {message}")]
    MalformedFrame { message: String, body: String },

    /// `state` frame whose `value` is not a finite number.
    #[error("Invalid state value: {value}")]
    InvalidValue { value: String },

    /// Outbound frame could not be encoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Returns `true` if the connection is gone and the caller should
    /// treat the device as unreachable.
    pub fn is_connection_closed(&self) -> bool {
        matches!(self, Self::WebSocketClosed { .. })
    }

    /// Close code and reason, if this is a closed-connection error.
    pub fn close_details(&self) -> Option<(u16, &str)> {
        match self {
            Self::WebSocketClosed { code, reason } => Some((*code, reason.as_str())),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_errors_are_flagged() {
        let err = Error::WebSocketClosed {
            code: 1000,
            reason: "bye".into(),
        };
        assert!(err.is_connection_closed());
        assert_eq!(err.close_details(), Some((1000, "bye")));
    }

    #[test]
    fn protocol_errors_are_not_closed() {
        let err = Error::InvalidValue { value: "\"abc\"".into() };
        assert!(!err.is_connection_closed());
        assert!(err.close_details().is_none());
    }
}
