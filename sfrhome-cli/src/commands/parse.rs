//! Parse command - normalize a local XML file.

use std::path::Path;

use anyhow::Result;
use sfrhome_core::{normalize_devices, DeviceSnapshot, FetchSource};
use tracing::{instrument, warn};

use crate::settings::{load_config, RunSettings};
use crate::{Cli, ExitCode};

use super::fetch::deliver;

/// Runs the parse command.
pub async fn run(file: &Path, cli: &Cli) -> Result<ExitCode> {
    let config = load_config(cli.config.as_deref())?;
    let settings = RunSettings::resolve(&cli.fetch, &config);
    run_with(file, &settings, cli).await
}

/// Normalizes `file` and exports the result like a network fetch.
#[instrument(skip(settings, cli), fields(file = %file.display()))]
pub async fn run_with(file: &Path, settings: &RunSettings, cli: &Cli) -> Result<ExitCode> {
    let bytes = match tokio::fs::read(file).await {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("[!] Cannot read {}: {e}", file.display());
            return Ok(ExitCode::ParseError);
        }
    };

    let outcome = normalize_devices(&bytes);
    if let Some(reason) = &outcome.failure {
        eprintln!("[!] {} is not a device list: {reason}", file.display());
        return Ok(ExitCode::ParseError);
    }
    if outcome.recovered_errors > 0 {
        warn!(
            skipped = outcome.recovered_errors,
            "Malformed fragments skipped in local file"
        );
    }

    let snapshot = DeviceSnapshot::new(outcome.devices, FetchSource::LocalFile);
    deliver(&snapshot, settings, cli).await
}
