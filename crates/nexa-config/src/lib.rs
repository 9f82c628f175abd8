//! Configuration for the nexa tools.
//!
//! One TOML file holds the session settings and every configured device.
//! Loading layers defaults, the file and `NEXA_` environment variables;
//! the device table doubles as the persistent [`EntryStore`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use nexa_core::{CoreError, DeviceEntry, EntryStore, SessionSettings};

/// Environment variable that overrides the config file location.
pub const CONFIG_ENV: &str = "NEXA_CONFIG";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

impl From<ConfigError> for CoreError {
    fn from(err: ConfigError) -> Self {
        CoreError::Store {
            message: err.to_string(),
        }
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Default, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub defaults: Defaults,

    #[serde(default)]
    pub session: SessionConfig,

    /// Configured devices, keyed by device id.
    #[serde(default)]
    pub devices: BTreeMap<String, DeviceEntry>,
}

/// CLI defaults.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    /// Seconds a one-shot command waits for the device to come online.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            timeout: default_timeout(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_timeout() -> u64 {
    10
}

/// How sessions reach devices.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SessionConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_path")]
    pub path: String,

    /// Fixed wait between connection attempts.
    #[serde(default = "default_retry_delay")]
    pub retry_delay_secs: u64,

    /// Oldest firmware admitted from discovery.
    #[serde(default = "default_min_firmware")]
    pub min_firmware: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            path: default_path(),
            retry_delay_secs: default_retry_delay(),
            min_firmware: default_min_firmware(),
        }
    }
}

fn default_port() -> u16 {
    nexa_api::websocket::DEFAULT_PORT
}
fn default_path() -> String {
    nexa_api::websocket::DEFAULT_PATH.into()
}
fn default_retry_delay() -> u64 {
    nexa_core::config::DEFAULT_RETRY_DELAY.as_secs()
}
fn default_min_firmware() -> String {
    nexa_core::MIN_FIRMWARE_VERSION.into()
}

impl SessionConfig {
    /// Validate and convert to the core's runtime settings.
    pub fn to_settings(&self) -> Result<SessionSettings, ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::Validation {
                field: "session.port".into(),
                reason: "must be between 1 and 65535".into(),
            });
        }
        if self.retry_delay_secs == 0 {
            return Err(ConfigError::Validation {
                field: "session.retry_delay_secs".into(),
                reason: "must be at least 1".into(),
            });
        }
        if !nexa_core::version::is_valid(&self.min_firmware) {
            return Err(ConfigError::Validation {
                field: "session.min_firmware".into(),
                reason: format!("'{}' is not a dotted version", self.min_firmware),
            });
        }

        Ok(SessionSettings {
            port: self.port,
            path: self.path.clone(),
            retry_delay: Duration::from_secs(self.retry_delay_secs),
            min_firmware: self.min_firmware.clone(),
        })
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path: `NEXA_CONFIG`, then platform conventions.
pub fn config_path() -> PathBuf {
    if let Some(path) = std::env::var_os(CONFIG_ENV).filter(|p| !p.is_empty()) {
        return PathBuf::from(path);
    }

    ProjectDirs::from("com", "nexa", "nexa").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("nexa");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load config from `path` layered over defaults, then `NEXA_` env vars
/// (`__` separates nesting, e.g. `NEXA_SESSION__RETRY_DELAY_SECS`).
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("NEXA_").ignore(&["CONFIG"]).split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write it to `path`, creating parent
/// directories.
pub fn save_config_to(path: &Path, cfg: &Config) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

/// Read only the file, without defaults layering or env overrides.
fn read_file(path: &Path) -> Result<Config, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(text) => toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Config::default()),
        Err(e) => Err(e.into()),
    }
}

// ── Entry store ─────────────────────────────────────────────────────

/// Entry store backed by the `[devices]` table of a config file.
///
/// Every write re-reads the file, so other sections and hand edits are
/// preserved.
#[derive(Debug)]
pub struct FileEntryStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileEntryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn update<T>(&self, f: impl FnOnce(&mut Config) -> T) -> Result<T, ConfigError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut config = read_file(&self.path)?;
        let result = f(&mut config);
        save_config_to(&self.path, &config)?;
        debug!(path = %self.path.display(), devices = config.devices.len(), "saved device entries");
        Ok(result)
    }
}

impl EntryStore for FileEntryStore {
    fn entries(&self) -> Result<Vec<DeviceEntry>, CoreError> {
        Ok(read_file(&self.path)?.devices.into_values().collect())
    }

    fn get(&self, device_id: &str) -> Result<Option<DeviceEntry>, CoreError> {
        Ok(read_file(&self.path)?.devices.remove(device_id))
    }

    fn upsert(&self, entry: DeviceEntry) -> Result<(), CoreError> {
        self.update(|config| {
            config.devices.insert(entry.device_id.clone(), entry);
        })?;
        Ok(())
    }

    fn remove(&self, device_id: &str) -> Result<Option<DeviceEntry>, CoreError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut config = read_file(&self.path)?;
        let removed = config.devices.remove(device_id);
        if removed.is_some() {
            save_config_to(&self.path, &config)?;
        }
        Ok(removed)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use nexa_core::{DeviceModel, Platform};
    use pretty_assertions::assert_eq;

    use super::*;

    fn lamp() -> DeviceEntry {
        DeviceEntry::new("a1b2c3", "192.168.1.20", "Lamp", DeviceModel::Wbd01)
    }

    #[test]
    fn defaults_match_device_protocol() {
        let settings = SessionConfig::default().to_settings().unwrap();
        assert_eq!(settings, SessionSettings::default());
        assert_eq!(settings.retry_delay, Duration::from_secs(30));
    }

    #[test]
    fn partial_file_is_layered_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[session]\nretry_delay_secs = 5\n").unwrap();

        let config = load_config_from(&path).unwrap();

        assert_eq!(config.session.retry_delay_secs, 5);
        assert_eq!(config.session.port, 3000);
        assert_eq!(config.defaults.output, "table");
        assert!(config.devices.is_empty());
    }

    #[test]
    fn invalid_session_values_are_rejected() {
        let session = SessionConfig {
            port: 0,
            ..SessionConfig::default()
        };
        assert!(matches!(
            session.to_settings(),
            Err(ConfigError::Validation { .. })
        ));

        let session = SessionConfig {
            min_firmware: "latest".into(),
            ..SessionConfig::default()
        };
        assert!(matches!(
            session.to_settings(),
            Err(ConfigError::Validation { field, .. }) if field == "session.min_firmware"
        ));

        let session = SessionConfig {
            min_firmware: "1.0-beta".into(),
            ..SessionConfig::default()
        };
        assert!(session.to_settings().is_ok());
    }

    #[test]
    fn store_persists_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let store = FileEntryStore::new(&path);

        store.upsert(lamp()).unwrap();

        let reopened = FileEntryStore::new(&path);
        let entries = reopened.entries().unwrap();
        assert_eq!(entries, vec![lamp()]);
        assert_eq!(entries[0].platform, Platform::Light);

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("[devices.a1b2c3]"), "{text}");
    }

    #[test]
    fn store_keeps_other_sections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[session]\nport = 3100\n").unwrap();
        let store = FileEntryStore::new(&path);

        store.upsert(lamp()).unwrap();

        let config = load_config_from(&path).unwrap();
        assert_eq!(config.session.port, 3100);
        assert_eq!(config.devices.len(), 1);
    }

    #[test]
    fn store_remove_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileEntryStore::new(dir.path().join("config.toml"));
        store.upsert(lamp()).unwrap();

        assert_eq!(store.remove("a1b2c3").unwrap(), Some(lamp()));
        assert_eq!(store.remove("a1b2c3").unwrap(), None);
        assert!(store.get("a1b2c3").unwrap().is_none());
    }

    #[test]
    fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileEntryStore::new(dir.path().join("absent.toml"));
        assert!(store.entries().unwrap().is_empty());
    }
}
