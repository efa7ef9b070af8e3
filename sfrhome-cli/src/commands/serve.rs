//! Serve command - run the control API stub.

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use crate::control::{self, DEFAULT_BIND};
use crate::ExitCode;

/// Arguments for the serve command.
#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    /// Address to listen on.
    #[arg(long, default_value = DEFAULT_BIND)]
    pub bind: String,
}

/// Runs the serve command until interrupted.
pub async fn run(args: &ServeArgs) -> Result<ExitCode> {
    let listener = tokio::net::TcpListener::bind(&args.bind)
        .await
        .with_context(|| format!("Cannot listen on {}", args.bind))?;

    info!(bind = %args.bind, "Control API listening");
    eprintln!("[*] Control API listening on http://{}", args.bind);

    axum::serve(listener, control::router())
        .await
        .context("Control API stopped")?;

    Ok(ExitCode::Success)
}
