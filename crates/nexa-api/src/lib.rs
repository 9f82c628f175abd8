// nexa-api: Wire protocol and WebSocket transport for System Nexa 2 devices

pub mod error;
pub mod protocol;
pub mod websocket;

pub use error::Error;
pub use protocol::{InboundMessage, OutboundFrame, StateValue, parse_inbound};
pub use websocket::{Connection, Connector, Endpoint, FrameSink, FrameStream, WsConnector};
