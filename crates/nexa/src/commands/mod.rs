//! Command dispatch: bridges CLI args -> supervisor calls -> output formatting.

pub mod config_cmd;
pub mod control;
pub mod devices;
pub mod run;
pub mod version_check;

use crate::cli::{Command, GlobalOpts};
use crate::config::Context;
use crate::error::CliError;

/// Dispatch a config-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, ctx: &Context, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Run => run::handle(ctx, global).await,
        Command::On(args) => control::turn_on(ctx, &args, global).await,
        Command::Off(args) => control::turn_off(ctx, &args, global).await,
        Command::Toggle(args) => control::toggle(ctx, &args, global).await,
        Command::Devices(args) => devices::handle(ctx, args, global).await,
        // Handled before the config is loaded
        Command::VersionCheck(_) | Command::Config(_) | Command::Completions(_) => {
            Err(CliError::Internal("command dispatched twice".into()))
        }
    }
}
