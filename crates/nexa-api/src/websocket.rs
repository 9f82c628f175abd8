//! WebSocket transport to a single device.
//!
//! A device exposes one live socket at `ws://{host}:3000/live`. This module
//! opens it and hands back the write and read halves as boxed trait objects,
//! so the session layer can be driven by a real socket or by a scripted
//! connection in tests.
//!
//! # Example
//!
//! ```rust,ignore
//! use nexa_api::websocket::{Connector, Endpoint, WsConnector};
//!
//! let endpoint = Endpoint::new("192.168.1.42");
//! let connection = WsConnector.connect(&endpoint.url()?).await?;
//! ```

use std::fmt;
use std::io;
use std::pin::Pin;

use futures_util::future::BoxFuture;
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio_tungstenite::tungstenite::error::ProtocolError;
use url::Url;

use crate::error::{ABNORMAL_CLOSE_CODE, Error};
use crate::protocol::OutboundFrame;

pub use tokio_tungstenite::tungstenite::Error as WsError;
pub use tokio_tungstenite::tungstenite::Message;

// ── Endpoint ─────────────────────────────────────────────────────────

/// Port every device listens on.
pub const DEFAULT_PORT: u16 = 3000;

/// Path of the live state socket.
pub const DEFAULT_PATH: &str = "/live";

/// Where a device's live socket lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
    pub path: String,
}

impl Endpoint {
    /// Endpoint on the standard port and path.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_PORT,
            path: DEFAULT_PATH.into(),
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// `ws://` URL for this endpoint. IPv6 literals are bracketed.
    pub fn url(&self) -> Result<Url, Error> {
        let host = if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        };
        let path = if self.path.starts_with('/') {
            self.path.clone()
        } else {
            format!("/{}", self.path)
        };
        Ok(Url::parse(&format!("ws://{host}:{}{path}", self.port))?)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}{}", self.host, self.port, self.path)
    }
}

// ── Connection halves ────────────────────────────────────────────────

/// Write half of a live connection.
pub type FrameSink = Pin<Box<dyn Sink<Message, Error = WsError> + Send>>;

/// Read half of a live connection.
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<Message, WsError>> + Send>>;

/// An open connection, already split into its two halves.
pub struct Connection {
    pub sink: FrameSink,
    pub stream: FrameStream,
}

impl Connection {
    pub fn new(sink: FrameSink, stream: FrameStream) -> Self {
        Self { sink, stream }
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection").finish_non_exhaustive()
    }
}

// ── Connector ────────────────────────────────────────────────────────

/// Opens connections to a device.
pub trait Connector: Send + Sync + 'static {
    fn connect<'a>(&'a self, url: &'a Url) -> BoxFuture<'a, Result<Connection, Error>>;
}

/// [`Connector`] backed by `tokio-tungstenite`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

impl Connector for WsConnector {
    fn connect<'a>(&'a self, url: &'a Url) -> BoxFuture<'a, Result<Connection, Error>> {
        Box::pin(async move {
            tracing::debug!(url = %url, "opening WebSocket");

            let (ws_stream, _response) = tokio_tungstenite::connect_async(url.as_str())
                .await
                .map_err(|e| Error::WebSocketConnect(e.to_string()))?;

            let (write, read) = ws_stream.split();
            Ok(Connection::new(Box::pin(write), Box::pin(read)))
        })
    }
}

// ── Frame helpers ────────────────────────────────────────────────────

/// Encode and send one frame.
pub async fn send_frame(sink: &mut FrameSink, frame: &OutboundFrame) -> Result<(), Error> {
    let text = frame.encode()?;
    sink.send(Message::text(text)).await.map_err(classify)
}

/// JSON text carried by a data frame. Binary frames are accepted when
/// they hold UTF-8.
pub fn frame_text(message: &Message) -> Option<&str> {
    match message {
        Message::Text(text) => Some(text.as_str()),
        Message::Binary(bytes) => std::str::from_utf8(bytes).ok(),
        _ => None,
    }
}

/// Map a tungstenite error to [`Error`], separating "the connection is
/// gone" from every other failure.
pub fn classify(err: WsError) -> Error {
    let closed = match &err {
        WsError::ConnectionClosed
        | WsError::AlreadyClosed
        | WsError::Protocol(ProtocolError::ResetWithoutClosingHandshake) => true,
        WsError::Io(io_err) => matches!(
            io_err.kind(),
            io::ErrorKind::BrokenPipe
                | io::ErrorKind::ConnectionReset
                | io::ErrorKind::ConnectionAborted
                | io::ErrorKind::NotConnected
                | io::ErrorKind::UnexpectedEof
        ),
        _ => false,
    };

    if closed {
        Error::WebSocketClosed {
            code: ABNORMAL_CLOSE_CODE,
            reason: err.to_string(),
        }
    } else {
        Error::WebSocket(err.to_string())
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_defaults_to_live_socket() {
        let url = Endpoint::new("192.168.1.42").url().unwrap();
        assert_eq!(url.as_str(), "ws://192.168.1.42:3000/live");
    }

    #[test]
    fn endpoint_overrides() {
        let url = Endpoint::new("lamp.local")
            .with_port(8080)
            .with_path("socket")
            .url()
            .unwrap();
        assert_eq!(url.as_str(), "ws://lamp.local:8080/socket");
    }

    #[test]
    fn ipv6_host_is_bracketed() {
        let url = Endpoint::new("fe80::1").url().unwrap();
        assert_eq!(url.as_str(), "ws://[fe80::1]:3000/live");
    }

    #[test]
    fn closed_variants_classify_as_closed() {
        assert!(classify(WsError::ConnectionClosed).is_connection_closed());
        assert!(classify(WsError::AlreadyClosed).is_connection_closed());
        assert!(
            classify(WsError::Io(io::Error::from(io::ErrorKind::BrokenPipe)))
                .is_connection_closed()
        );
    }

    #[test]
    fn other_failures_do_not_classify_as_closed() {
        let err = classify(WsError::Io(io::Error::from(io::ErrorKind::PermissionDenied)));
        assert!(!err.is_connection_closed());
        assert!(matches!(err, Error::WebSocket(_)));
    }

    #[test]
    fn binary_frames_carry_text() {
        let msg = Message::binary(br#"{"type":"state","value":1}"#.to_vec());
        assert_eq!(frame_text(&msg), Some(r#"{"type":"state","value":1}"#));
        assert_eq!(frame_text(&Message::Ping(Vec::new().into())), None);
    }
}
