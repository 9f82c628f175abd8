//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use nexa_config::ConfigError;
use nexa_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const CONFLICT: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────

    #[error("Could not connect to device at {url}")]
    #[diagnostic(
        code(nexa::connection_failed),
        help(
            "Check that the device is powered and reachable on the local network.\n\
             URL: {url}"
        )
    )]
    ConnectionFailed {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Device '{device}' is not connected")]
    #[diagnostic(
        code(nexa::not_connected),
        help("The connection dropped before the command could be sent. Try again.")
    )]
    NotConnected { device: String },

    #[error("Device did not come online within {seconds}s")]
    #[diagnostic(
        code(nexa::timeout),
        help("Increase the wait with --timeout, or check the device's address with: nexa devices list")
    )]
    Timeout { seconds: u64 },

    // ── Devices ──────────────────────────────────────────────────────

    #[error("Device '{identifier}' not found")]
    #[diagnostic(code(nexa::not_found), help("Run: nexa devices list to see configured devices"))]
    NotFound { identifier: String },

    #[error("Device '{identifier}' is already configured")]
    #[diagnostic(code(nexa::conflict))]
    Conflict { identifier: String },

    #[error("Device not admitted: {message}")]
    #[diagnostic(code(nexa::rejected), help("Reason: {reason}"))]
    Rejected { reason: String, message: String },

    #[error("No devices configured")]
    #[diagnostic(
        code(nexa::no_devices),
        help(
            "Add one with: nexa devices admit --host <HOST> --name <NAME> --model <MODEL> --version <VERSION>\n\
             Config file: {path}"
        )
    )]
    NoDevices { path: String },

    #[error("Firmware {version} is older than {min}")]
    #[diagnostic(code(nexa::incompatible))]
    Incompatible { version: String, min: String },

    #[error("Device protocol error: {message}")]
    #[diagnostic(code(nexa::protocol))]
    Protocol { message: String },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(nexa::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("Configuration error: {message}")]
    #[diagnostic(
        code(nexa::config),
        help("Check the config file: {path}")
    )]
    Config { message: String, path: String },

    #[error("Internal error: {0}")]
    #[diagnostic(code(nexa::internal))]
    Internal(String),

    // ── IO / Serialization ────────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render JSON: {0}")]
    #[diagnostic(code(nexa::json))]
    Json(#[from] serde_json::Error),

    #[error("Failed to render YAML: {0}")]
    #[diagnostic(code(nexa::yaml))]
    Yaml(#[from] serde_yaml::Error),

    #[error("Failed to render TOML: {0}")]
    #[diagnostic(code(nexa::toml))]
    Toml(#[from] toml::ser::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::NotConnected { .. } => exit_code::CONNECTION,
            Self::NotFound { .. } | Self::NoDevices { .. } => exit_code::NOT_FOUND,
            Self::Conflict { .. } => exit_code::CONFLICT,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Validation { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => CliError::ConnectionFailed {
                url,
                source: reason.into(),
            },

            CoreError::ConnectionClosed { code, reason } => CliError::ConnectionFailed {
                url: "(closed)".into(),
                source: format!("connection closed with code {code}: {reason}").into(),
            },

            CoreError::NotConnected { device } => CliError::NotConnected { device },

            CoreError::Timeout { timeout_secs } => CliError::Timeout {
                seconds: timeout_secs,
            },

            CoreError::DeviceNotFound { identifier } => CliError::NotFound { identifier },

            CoreError::AlreadyConfigured { identifier } => CliError::Conflict { identifier },

            CoreError::Rejected(rejection) => CliError::Rejected {
                reason: rejection.reason().into(),
                message: rejection.to_string(),
            },

            CoreError::Protocol { message } => CliError::Protocol { message },

            CoreError::Store { message } | CoreError::Config { message } => CliError::Config {
                message,
                path: nexa_config::config_path().display().to_string(),
            },

            CoreError::Internal(message) => CliError::Internal(message),
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::Parse { path, source } => CliError::Config {
                message: source.to_string(),
                path: path.display().to_string(),
            },
            other => CliError::Config {
                message: other.to_string(),
                path: nexa_config::config_path().display().to_string(),
            },
        }
    }
}
