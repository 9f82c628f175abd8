//! `nexa run`: supervise every configured device until interrupted.

use nexa_core::EntityView;

use crate::cli::GlobalOpts;
use crate::config::Context;
use crate::error::CliError;
use crate::output;

pub async fn handle(ctx: &Context, global: &GlobalOpts) -> Result<(), CliError> {
    let supervisor = ctx.supervisor();

    let started = supervisor.start().await?;
    if started == 0 {
        supervisor.shutdown().await;
        return Err(CliError::NoDevices {
            path: ctx.path.display().to_string(),
        });
    }

    for entity in supervisor.entities().await {
        let entity_id = entity.entity_id().to_owned();
        let quiet = global.quiet;
        entity.on_change(move |view: &EntityView| {
            let state = output::describe_state(view);
            tracing::info!(entity = %entity_id, %state, "state changed");
            output::print_output(&format!("{entity_id}: {state}"), quiet);
        });
    }

    tracing::info!(devices = started, "supervising; press Ctrl-C to stop");
    tokio::signal::ctrl_c().await?;

    tracing::info!("shutting down");
    supervisor.shutdown().await;
    Ok(())
}
