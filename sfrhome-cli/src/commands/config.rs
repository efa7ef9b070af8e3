//! Config command - manage configuration.

use std::path::Path;

use anyhow::Result;
use clap::{Args, Subcommand};
use sfrhome_store::{default_config_dir, Config};
use tracing::info;

use crate::output::JsonFormatter;
use crate::settings::load_config;
use crate::{Cli, ExitCode, OutputFormat};

const REDACTED: &str = "********";

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Config subcommands.
#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration.
    Show,

    /// Show configuration paths.
    Path,

    /// Write a default configuration file if none exists.
    Init,
}

/// Runs the config command.
pub fn run(args: &ConfigArgs, cli: &Cli) -> Result<ExitCode> {
    let path = cli.config.clone().unwrap_or_else(Config::default_path);
    match &args.action {
        ConfigAction::Show => show_config(&path, cli)?,
        ConfigAction::Path => show_paths(&path, cli)?,
        ConfigAction::Init => {
            if init_config(&path)? {
                println!("Wrote {}", path.display());
            } else {
                println!("{} already exists", path.display());
            }
        }
    }
    Ok(ExitCode::Success)
}

fn show_config(path: &Path, cli: &Cli) -> Result<()> {
    let config = redacted(load_config(Some(path))?);

    match cli.format {
        OutputFormat::Text => {
            println!("SFR Home Configuration");
            println!("{}", "─".repeat(40));
            println!();
            println!("Base URL:      {}", config.portal.base_url);
            for (label, url) in [
                ("Login URL:    ", &config.portal.login_url),
                ("SSO URL:      ", &config.portal.sso_url),
                ("Dashboard URL:", &config.portal.dashboard_url),
                ("Resource URL: ", &config.portal.resource_url),
            ] {
                if let Some(url) = url {
                    println!("{label} {url}");
                }
            }
            println!("Field style:   {}", config.portal.field_style);
            println!("Timeout:       {}s", config.network.timeout_secs);
            println!();
            println!("Cookie file:   {}", config.cookie_file_path().display());
            println!("Debug dir:     {}", config.debug_dir_path().display());
            println!(
                "Username:      {}",
                config.credentials.username.as_deref().unwrap_or("(not set)")
            );
            println!(
                "Password:      {}",
                config.credentials.password.as_deref().unwrap_or("(not set)")
            );
        }
        OutputFormat::Json => {
            let formatter = JsonFormatter::new(cli.pretty);
            println!("{}", formatter.format(&config)?);
        }
    }

    Ok(())
}

fn show_paths(path: &Path, cli: &Cli) -> Result<()> {
    let config_dir = default_config_dir();
    let cookie_file = load_config(Some(path))?.cookie_file_path();

    match cli.format {
        OutputFormat::Text => {
            println!("Configuration Paths");
            println!("{}", "─".repeat(40));
            println!();
            println!("Config dir:    {}", config_dir.display());
            println!("Config file:   {}", path.display());
            println!("Cookie file:   {}", cookie_file.display());
        }
        OutputFormat::Json => {
            let paths = serde_json::json!({
                "config_dir": config_dir.display().to_string(),
                "config_file": path.display().to_string(),
                "cookie_file": cookie_file.display().to_string(),
            });
            let formatter = JsonFormatter::new(cli.pretty);
            println!("{}", formatter.format(&paths)?);
        }
    }

    Ok(())
}

/// Writes the default configuration to `path`. Returns false if a file is
/// already there.
fn init_config(path: &Path) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    Config::default().save_to(path)?;
    info!(path = %path.display(), "Configuration initialized");
    Ok(true)
}

fn redacted(mut config: Config) -> Config {
    if config.credentials.password.is_some() {
        config.credentials.password = Some(REDACTED.to_string());
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_writes_once() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sfrhome/config.json");

        assert!(init_config(&path).unwrap());
        assert_eq!(Config::load_from(&path).unwrap(), Config::default());

        std::fs::write(&path, r#"{"network": {"timeout_secs": 5}}"#).unwrap();
        assert!(!init_config(&path).unwrap());
        assert_eq!(Config::load_from(&path).unwrap().network.timeout_secs, 5);
    }

    #[test]
    fn test_password_redacted() {
        let mut config = Config::default();
        config.credentials.username = Some("me".into());
        config.credentials.password = Some("hunter2".into());

        let shown = redacted(config);
        assert_eq!(shown.credentials.username.as_deref(), Some("me"));
        assert_eq!(shown.credentials.password.as_deref(), Some(REDACTED));

        assert_eq!(redacted(Config::default()).credentials.password, None);
    }
}
