// Lint configuration for this crate
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! SFR Home CLI - fetch the device list of an SFR Home alarm system.
//!
//! # Examples
//!
//! ```bash
//! # Log in (prompting for the password) and export devices.json / devices.csv
//! sfrhome -u me@example.com
//!
//! # Reuse a browser session cookie
//! SFR_COOKIE="sid=...; ssoid=..." sfrhome
//!
//! # Normalize a saved XML dump, no network
//! sfrhome parse debug_mysensors.xml
//!
//! # Print the records as JSON
//! sfrhome --format json --pretty
//!
//! # Run the control API stub
//! sfrhome serve --bind 127.0.0.1:5000
//! ```

mod commands;
mod control;
mod credentials;
mod output;
mod settings;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::fetch::FetchArgs;
use commands::{config, fetch, parse, serve};

// ============================================================================
// CLI Definition
// ============================================================================

/// SFR Home CLI - alarm system device list exporter.
#[derive(Parser)]
#[command(name = "sfrhome")]
#[command(about = "SFR Home device list exporter")]
#[command(long_about = r#"
Fetches the device list of an SFR Home alarm system and exports it as
JSON and CSV.

Sessions are tried in order:
  1. the cookie given with --cookie or SFR_COOKIE
  2. the cookie jar saved by a previous run
  3. a fresh SSO login with --user / --password (prompted if missing)

Examples:
  sfrhome -u me@example.com        # Log in and export
  sfrhome --local dump.xml         # Normalize a local XML file
  sfrhome --format json            # Records on stdout
  sfrhome serve                    # Control API stub
"#)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run. If none, runs 'fetch' by default.
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Session, portal and output options.
    #[command(flatten)]
    pub fetch: FetchArgs,

    /// Output format (text or json).
    #[arg(long, short = 'f', default_value = "text", global = true)]
    pub format: OutputFormat,

    /// Pretty-print JSON output.
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Configuration file (defaults to ~/.config/sfrhome/config.json).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output (show debug info).
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Quiet mode (minimal output).
    #[arg(long, short, global = true)]
    pub quiet: bool,
}

/// CLI commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Fetch the device list (default if no command specified).
    Fetch,

    /// Normalize a local XML file without touching the network.
    Parse {
        /// XML file to read.
        file: PathBuf,
    },

    /// Run the control API stub.
    Serve(serve::ServeArgs),

    /// Manage configuration.
    Config(config::ConfigArgs),
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable text with colors.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

/// CLI exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Success.
    Success = 0,
    /// Every session attempt failed.
    FetchFailed = 1,
    /// Credentials or other configuration missing.
    MissingCredentials = 2,
    /// Local file unreadable or not XML.
    ParseError = 3,
}

// ============================================================================
// Logging Setup
// ============================================================================

fn setup_logging(verbose: bool, quiet: bool) {
    if quiet {
        return;
    }

    let filter = if verbose {
        EnvFilter::new("sfrhome=debug,info")
    } else {
        EnvFilter::new("sfrhome=warn")
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .without_time()
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let result = match &cli.command {
        Some(Commands::Fetch) | None => fetch::run(&cli).await,
        Some(Commands::Parse { file }) => parse::run(file, &cli).await,
        Some(Commands::Serve(args)) => serve::run(args).await,
        Some(Commands::Config(args)) => config::run(args, &cli),
    };

    let code = match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FetchFailed
        }
    };

    std::process::exit(code as i32);
}
