//! `nexa on|off|toggle`: one-shot control of a single device.
//!
//! Each command starts a session for just that device, waits for it to
//! come online, sends the command and reports the state the device echoes
//! back. Nothing is updated optimistically: if no echo arrives the last
//! known state is printed.

use std::sync::Arc;
use std::time::Duration;

use nexa_core::{Entity, EntityView, Supervisor, TurnOnOptions};
use serde::Serialize;

use crate::cli::{DeviceArg, GlobalOpts, OnArgs};
use crate::config::Context;
use crate::error::CliError;
use crate::output;

/// How long to wait for the device to report its new state.
const ECHO_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy)]
enum Action {
    On(TurnOnOptions),
    Off,
    Toggle,
}

#[derive(Debug, Serialize)]
struct ControlReport {
    device_id: String,
    entity_id: String,
    name: String,
    #[serde(flatten)]
    view: EntityView,
}

pub async fn turn_on(ctx: &Context, args: &OnArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let options = TurnOnOptions {
        brightness: args.brightness,
    };
    control(ctx, &args.device, Action::On(options), global).await
}

pub async fn turn_off(ctx: &Context, args: &DeviceArg, global: &GlobalOpts) -> Result<(), CliError> {
    control(ctx, &args.device, Action::Off, global).await
}

pub async fn toggle(ctx: &Context, args: &DeviceArg, global: &GlobalOpts) -> Result<(), CliError> {
    control(ctx, &args.device, Action::Toggle, global).await
}

async fn control(
    ctx: &Context,
    identifier: &str,
    action: Action,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let supervisor = ctx.supervisor();
    let result = run_action(&supervisor, ctx.timeout(global), identifier, action).await;
    supervisor.shutdown().await;

    let entity = result?;
    let report = ControlReport {
        device_id: entity.device_id().to_owned(),
        entity_id: entity.entity_id().to_owned(),
        name: entity.name().to_owned(),
        view: entity.view(),
    };
    let out = output::render_single(
        ctx.output(global),
        &report,
        |r| format!("{}: {}", r.name, output::describe_state(&r.view)),
        |r| output::describe_state(&r.view),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

async fn run_action(
    supervisor: &Supervisor,
    timeout: Duration,
    identifier: &str,
    action: Action,
) -> Result<Arc<Entity>, CliError> {
    let entity = supervisor.start_entry(identifier).await?;
    supervisor.wait_available(entity.device_id(), timeout).await?;

    let mut updates = entity.subscribe();

    tracing::debug!(entity = entity.entity_id(), ?action, "sending");
    match action {
        Action::On(options) => entity.turn_on(options).await?,
        Action::Off => entity.turn_off().await?,
        Action::Toggle => entity.toggle().await?,
    }

    if tokio::time::timeout(ECHO_TIMEOUT, updates.changed()).await.is_err() {
        tracing::warn!(entity = entity.entity_id(), "device did not report its new state");
    }
    Ok(entity)
}
