//! Fetch command - run the cookie ladder and export the device list.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use sfrhome_core::{DeviceSnapshot, SsoFieldStyle};
use sfrhome_fetch::{default_pipeline, ErrorClass, ProgressFn};
use tracing::{info, warn};

use crate::credentials::PromptCredentials;
use crate::output::{export_devices, JsonFormatter, TextFormatter};
use crate::settings::{load_config, RunSettings};
use crate::{Cli, ExitCode, OutputFormat};

use super::parse;

/// Session, portal and output options shared by every command.
#[derive(Args, Debug, Clone, Default)]
pub struct FetchArgs {
    /// Portal username (e-mail).
    #[arg(long, short = 'u', env = "SFR_USER", global = true)]
    pub user: Option<String>,

    /// Portal password (prompted when missing).
    #[arg(long, short = 'p', global = true)]
    pub password: Option<String>,

    /// Session cookie string ("name=value; name2=value2").
    #[arg(long, env = "SFR_COOKIE", global = true, hide_env_values = true)]
    pub cookie: Option<String>,

    /// Parse a local XML file instead of fetching.
    #[arg(long, global = true, value_name = "FILE")]
    pub local: Option<PathBuf>,

    /// Portal base URL.
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Login page URL.
    #[arg(long, global = true)]
    pub login_url: Option<String>,

    /// Dashboard URL opened after login.
    #[arg(long, global = true)]
    pub dashboard_url: Option<String>,

    /// Device list URL.
    #[arg(long, global = true)]
    pub resource_url: Option<String>,

    /// SSO token endpoint.
    #[arg(long, global = true)]
    pub sso_url: Option<String>,

    /// JSON export path.
    #[arg(long, global = true)]
    pub output_json: Option<PathBuf>,

    /// CSV export path.
    #[arg(long, global = true)]
    pub output_csv: Option<PathBuf>,

    /// Cookie jar path.
    #[arg(long, global = true)]
    pub cookie_file: Option<PathBuf>,

    /// Save every response as a debug artifact.
    #[arg(long, global = true)]
    pub debug: bool,

    /// Directory for debug artifacts.
    #[arg(long, global = true)]
    pub debug_dir: Option<PathBuf>,

    /// Request timeout in seconds.
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Credential field names sent to the SSO endpoint (vendor or plain).
    #[arg(long, global = true)]
    pub field_style: Option<SsoFieldStyle>,
}

/// Runs the fetch command.
pub async fn run(cli: &Cli) -> Result<ExitCode> {
    let config = load_config(cli.config.as_deref())?;
    let settings = RunSettings::resolve(&cli.fetch, &config);

    if let Some(file) = &cli.fetch.local {
        return parse::run_with(file, &settings, cli).await;
    }

    let credentials = Arc::new(PromptCredentials::from_terminal(
        settings.username.clone(),
        settings.password.clone(),
    ));
    let progress: Option<ProgressFn> = if cli.quiet {
        None
    } else {
        Some(Arc::new(|message: &str| eprintln!("[*] {message}")))
    };
    let ctx = settings.fetch_context(credentials, progress);

    let outcome = default_pipeline().execute(&ctx).await;
    info!(
        trace = ?outcome.trace(),
        attempts = outcome.attempts_count(),
        duration = ?outcome.duration,
        "Ladder finished"
    );

    match outcome.result {
        Ok(result) => {
            if result.recovered_errors > 0 {
                warn!(
                    skipped = result.recovered_errors,
                    "Malformed fragments skipped in device list"
                );
            }
            deliver(&result.into_snapshot(), &settings, cli).await
        }
        Err(error) => {
            let formatter = TextFormatter::new(!cli.no_color);
            eprintln!("[!] {error}");
            for attempt in &outcome.attempts {
                if let Some(cause) = attempt.error() {
                    eprintln!("    {}", formatter.format_error(&attempt.strategy_id, cause));
                }
            }

            Ok(match error.class() {
                ErrorClass::Configuration => ExitCode::MissingCredentials,
                ErrorClass::ProtocolDrift | ErrorClass::Transient => ExitCode::FetchFailed,
            })
        }
    }
}

/// Exports a snapshot and prints it.
///
/// Export failures are warnings; the exit code stays `Success`.
pub async fn deliver(snapshot: &DeviceSnapshot, settings: &RunSettings, cli: &Cli) -> Result<ExitCode> {
    if snapshot.is_empty() {
        warn!("No devices found in the device list");
        if !cli.quiet {
            eprintln!("[!] Device list is empty");
        }
    }

    let report = export_devices(&snapshot.devices, &settings.json_path, &settings.csv_path).await;
    if !cli.quiet {
        for path in &report.written {
            eprintln!("[+] Wrote {}", path.display());
        }
    }
    for (path, cause) in &report.failed {
        eprintln!("[!] Cannot write {}: {cause}", path.display());
    }

    match cli.format {
        OutputFormat::Json => {
            let formatter = JsonFormatter::new(cli.pretty);
            println!("{}", formatter.format_snapshot(snapshot)?);
        }
        OutputFormat::Text => {
            if !cli.quiet {
                let formatter = TextFormatter::new(!cli.no_color);
                println!("{}", formatter.format_summary(snapshot));
            }
        }
    }

    Ok(ExitCode::Success)
}
