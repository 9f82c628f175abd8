// ── Core error types ──
//
// User-facing errors from nexa-core. Consumers never see tungstenite or
// serde_json failures directly; the `From<nexa_api::Error>` impl
// translates transport-layer errors into domain variants.

use thiserror::Error;

use crate::discovery::Rejection;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to device at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Connection to device closed (code {code}): {reason}")]
    ConnectionClosed { code: u16, reason: String },

    #[error("Device '{device}' is not connected")]
    NotConnected { device: String },

    #[error("Device did not become available within {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Device not found: {identifier}")]
    DeviceNotFound { identifier: String },

    #[error("Device already configured: {identifier}")]
    AlreadyConfigured { identifier: String },

    #[error("Device advertisement rejected: {0}")]
    Rejected(#[from] Rejection),

    #[error("Invalid frame from device: {message}")]
    Protocol { message: String },

    // ── Storage errors ───────────────────────────────────────────────
    #[error("Entry store error: {message}")]
    Store { message: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<nexa_api::Error> for CoreError {
    fn from(err: nexa_api::Error) -> Self {
        match err {
            nexa_api::Error::WebSocketConnect(reason) => CoreError::ConnectionFailed {
                url: String::new(),
                reason,
            },
            nexa_api::Error::WebSocketClosed { code, reason } => {
                CoreError::ConnectionClosed { code, reason }
            }
            nexa_api::Error::WebSocket(reason) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("WebSocket error: {reason}"),
            },
            nexa_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid device URL: {e}"),
            },
            nexa_api::Error::MalformedFrame { message, body: _ } => {
                CoreError::Protocol { message }
            }
            nexa_api::Error::InvalidValue { value } => CoreError::Protocol {
                message: format!("invalid state value {value}"),
            },
            nexa_api::Error::Serialization(e) => {
                CoreError::Internal(format!("Serialization error: {e}"))
            }
        }
    }
}
