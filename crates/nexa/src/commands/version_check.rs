//! `nexa version-check`: compare a firmware version against a minimum.

use nexa_core::is_compatible;
use serde::Serialize;

use crate::cli::{GlobalOpts, OutputFormat, VersionCheckArgs};
use crate::error::CliError;
use crate::output;

#[derive(Debug, Serialize)]
struct VersionReport<'a> {
    version: &'a str,
    min_version: &'a str,
    compatible: bool,
}

pub fn handle(args: &VersionCheckArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let report = VersionReport {
        version: &args.version,
        min_version: &args.min,
        compatible: is_compatible(&args.version, &args.min),
    };

    let out = output::render_single(
        global.output.unwrap_or(OutputFormat::Table),
        &report,
        |r| {
            if r.compatible {
                format!("{} is compatible (minimum {})", r.version, r.min_version)
            } else {
                format!("{} is not compatible (minimum {})", r.version, r.min_version)
            }
        },
        |r| r.compatible.to_string(),
    )?;
    output::print_output(&out, global.quiet);

    if report.compatible {
        Ok(())
    } else {
        Err(CliError::Incompatible {
            version: args.version.clone(),
            min: args.min.clone(),
        })
    }
}
