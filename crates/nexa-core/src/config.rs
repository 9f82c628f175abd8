// ── Runtime session configuration ──
//
// These types describe *how* sessions reach their devices. They never
// touch disk: the binary builds a `SessionSettings` from its config file
// and hands it in.

use std::time::Duration;

use nexa_api::Endpoint;
use nexa_api::websocket::{DEFAULT_PATH, DEFAULT_PORT};

use crate::version::MIN_FIRMWARE_VERSION;

/// Fixed wait between two connection attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(30);

/// Settings shared by every device session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    /// Device socket port.
    pub port: u16,
    /// Device socket path.
    pub path: String,
    /// Wait between connection attempts, whatever ended the last one.
    pub retry_delay: Duration,
    /// Minimum firmware accepted at admission.
    pub min_firmware: String,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            path: DEFAULT_PATH.into(),
            retry_delay: DEFAULT_RETRY_DELAY,
            min_firmware: MIN_FIRMWARE_VERSION.into(),
        }
    }
}

impl SessionSettings {
    /// Socket endpoint for a device host.
    pub fn endpoint(&self, host: &str) -> Endpoint {
        Endpoint::new(host)
            .with_port(self.port)
            .with_path(self.path.clone())
    }
}
