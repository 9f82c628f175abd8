//! Clap derive structures for the `nexa` CLI.
//!
//! Kept free of workspace crates so `build.rs` can include it for man
//! page generation.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

// ── Top-Level CLI ────────────────────────────────────────────────────

/// nexa -- control System Nexa 2 switches, plugs and dimmers
#[derive(Debug, Parser)]
#[command(
    name = "nexa",
    version,
    about = "Control System Nexa 2 devices on the local network",
    long_about = "Talks to System Nexa 2 wall switches, plugs and dimmers over their\n\
        local WebSocket interface. Devices are kept in a TOML config file and\n\
        supervised with automatic reconnection.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config file path
    #[arg(long, env = "NEXA_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format (defaults to the config file's choice)
    #[arg(long, short = 'o', env = "NEXA_OUTPUT", global = true)]
    pub output: Option<OutputFormat>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Seconds to wait for a device to come online
    #[arg(long, env = "NEXA_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output Enum ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Supervise every configured device until interrupted
    Run,

    /// Turn a device on
    On(OnArgs),

    /// Turn a device off
    Off(DeviceArg),

    /// Toggle a device
    Toggle(DeviceArg),

    /// Manage configured devices
    #[command(alias = "dev", alias = "d")]
    Devices(DevicesArgs),

    /// Check a firmware version against the minimum supported version
    #[command(disable_version_flag = true)]
    VersionCheck(VersionCheckArgs),

    /// Inspect the configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Device control ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct DeviceArg {
    /// Device id or name
    pub device: String,
}

#[derive(Debug, Args)]
pub struct OnArgs {
    /// Device id or name
    pub device: String,

    /// Brightness for dimmers (0-255)
    #[arg(long, short = 'b')]
    pub brightness: Option<u8>,
}

// ── Devices ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct DevicesArgs {
    #[command(subcommand)]
    pub command: DevicesCommand,
}

#[derive(Debug, Subcommand)]
pub enum DevicesCommand {
    /// List configured devices
    #[command(alias = "ls")]
    List,

    /// Admit a device as if it had been discovered on the network
    #[command(disable_version_flag = true)]
    Admit(AdmitArgs),

    /// Forget a configured device
    #[command(alias = "rm")]
    Remove(DeviceArg),
}

#[derive(Debug, Args)]
pub struct AdmitArgs {
    /// Device address
    #[arg(long)]
    pub host: String,

    /// Device name (a full service name is cut at the first '.')
    #[arg(long)]
    pub name: String,

    /// Advertised model, e.g. WBD-01
    #[arg(long)]
    pub model: Option<String>,

    /// Advertised firmware version
    #[arg(long)]
    pub version: Option<String>,

    /// Advertised device id (defaults to the name)
    #[arg(long)]
    pub id: Option<String>,
}

// ── Version check ────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct VersionCheckArgs {
    /// Firmware version to check
    pub version: String,

    /// Minimum accepted version
    #[arg(long, default_value = "0.9.5")]
    pub min: String,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file path
    Path,

    /// Print the effective configuration
    Show,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Target shell
    pub shell: Shell,
}
