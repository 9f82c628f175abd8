//! Device command handlers.

use nexa_core::{Admission, Advertisement, DeviceEntry, discovery};
use tabled::Tabled;

use crate::cli::{AdmitArgs, DeviceArg, DevicesArgs, DevicesCommand, GlobalOpts};
use crate::config::Context;
use crate::error::CliError;
use crate::output;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Model")]
    model: String,
    #[tabled(rename = "Type")]
    platform: String,
    #[tabled(rename = "Class")]
    class: String,
    #[tabled(rename = "Host")]
    host: String,
    #[tabled(rename = "Entity")]
    entity: String,
}

impl From<&DeviceEntry> for DeviceRow {
    fn from(e: &DeviceEntry) -> Self {
        Self {
            id: e.device_id.clone(),
            name: e.name.clone(),
            model: e.model.clone(),
            platform: e.platform.to_string(),
            class: e.device_class().map(|c| c.to_string()).unwrap_or_default(),
            host: e.host.clone(),
            entity: e.entity_id(),
        }
    }
}

fn detail(e: &DeviceEntry) -> String {
    [
        format!("ID:       {}", e.device_id),
        format!("Title:    {}", e.title),
        format!("Host:     {}", e.host),
        format!("Model:    {}", e.model),
        format!("Type:     {}", e.platform),
        format!(
            "Class:    {}",
            e.device_class().map_or_else(|| "-".into(), |c| c.to_string())
        ),
        format!("Entity:   {}", e.entity_id()),
        format!("Unique:   {}", e.unique_id()),
    ]
    .join("\n")
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(ctx: &Context, args: DevicesArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        DevicesCommand::List => list(ctx, global),
        DevicesCommand::Admit(args) => admit(ctx, &args, global).await,
        DevicesCommand::Remove(args) => remove(ctx, &args, global).await,
    }
}

fn list(ctx: &Context, global: &GlobalOpts) -> Result<(), CliError> {
    let entries: Vec<DeviceEntry> = ctx.config.devices.values().cloned().collect();
    let out = output::render_list(
        ctx.output(global),
        &entries,
        |e| DeviceRow::from(e),
        |e| e.device_id.clone(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

async fn admit(ctx: &Context, args: &AdmitArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let mut ad = Advertisement::new(&args.host, &args.name);
    if let Some(ref id) = args.id {
        ad = ad.with_property(discovery::PROPERTY_ID, id);
    }
    if let Some(ref model) = args.model {
        ad = ad.with_property(discovery::PROPERTY_MODEL, model);
    }
    if let Some(ref version) = args.version {
        ad = ad.with_property(discovery::PROPERTY_VERSION, version);
    }

    let supervisor = ctx.supervisor();
    let admission = supervisor.admit(&ad).await?;

    let status = match &admission {
        Admission::Created(entry) => format!("Configured {}", entry.title),
        Admission::HostUpdated {
            entry,
            previous_host,
        } => format!("Moved {} from {previous_host} to {}", entry.title, entry.host),
        Admission::AlreadyConfigured(entry) => format!("{} is already configured", entry.title),
    };
    tracing::info!("{status}");

    let out = output::render_single(
        ctx.output(global),
        admission.entry(),
        |e| format!("{status}\n\n{}", detail(e)),
        |e| e.device_id.clone(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

async fn remove(ctx: &Context, args: &DeviceArg, global: &GlobalOpts) -> Result<(), CliError> {
    let supervisor = ctx.supervisor();

    let entry = match supervisor.find_entry(&args.device) {
        Ok(entry) => entry,
        Err(nexa_core::CoreError::DeviceNotFound { .. }) => {
            output::print_output(&format!("{} is not configured", args.device), global.quiet);
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    if supervisor.remove_entry(&entry.device_id).await? {
        output::print_output(&format!("Removed {}", entry.title), global.quiet);
    }
    Ok(())
}
