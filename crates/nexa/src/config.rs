//! CLI-side configuration: resolve the config file from global flags and
//! build the supervisor the device commands run against.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::ValueEnum;
use nexa_api::WsConnector;
use nexa_config::{Config, FileEntryStore};
use nexa_core::{SessionSettings, Supervisor};

use crate::cli::{GlobalOpts, OutputFormat};
use crate::error::CliError;

/// Config file selected by `--config` / `NEXA_CONFIG`, else the platform
/// default.
pub fn config_path(global: &GlobalOpts) -> PathBuf {
    global
        .config
        .clone()
        .unwrap_or_else(nexa_config::config_path)
}

/// Everything a device command needs, loaded once per invocation.
#[derive(Debug)]
pub struct Context {
    pub path: PathBuf,
    pub config: Config,
    pub settings: SessionSettings,
}

impl Context {
    pub fn load(global: &GlobalOpts) -> Result<Self, CliError> {
        let path = config_path(global);
        let config = nexa_config::load_config_from(&path)?;
        let settings = config.session.to_settings()?;
        tracing::debug!(path = %path.display(), devices = config.devices.len(), "loaded config");

        Ok(Self {
            path,
            config,
            settings,
        })
    }

    /// Supervisor over the config file's device table, using real sockets.
    pub fn supervisor(&self) -> Supervisor {
        Supervisor::new(
            self.settings.clone(),
            Arc::new(FileEntryStore::new(self.path.clone())),
            Arc::new(WsConnector),
        )
    }

    /// How long one-shot commands wait for a device.
    pub fn timeout(&self, global: &GlobalOpts) -> Duration {
        Duration::from_secs(global.timeout.unwrap_or(self.config.defaults.timeout))
    }

    /// `--output`, else the config default, else table.
    pub fn output(&self, global: &GlobalOpts) -> OutputFormat {
        global.output.unwrap_or_else(|| {
            OutputFormat::from_str(&self.config.defaults.output, true).unwrap_or(OutputFormat::Table)
        })
    }
}
