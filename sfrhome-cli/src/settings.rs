//! Effective run settings.
//!
//! Layers, lowest first: built-in defaults, config file, environment,
//! command-line flags. Clap already folds the environment into the flag
//! values, so only the config file needs merging here.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use sfrhome_fetch::{
    ArtifactWriter, CredentialProvider, FetchContext, FetchSettings, PortalSettings, ProgressFn,
};
use sfrhome_store::{Config, CookieFile};
use tracing::debug;

use crate::commands::fetch::FetchArgs;

/// JSON export path when neither flag nor config sets one.
pub const DEFAULT_JSON_OUTPUT: &str = "devices.json";

/// CSV export path when neither flag nor config sets one.
pub const DEFAULT_CSV_OUTPUT: &str = "devices.csv";

/// Loads the config file given on the command line, or the default one.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = path.map_or_else(Config::default_path, Path::to_path_buf);
    Config::load_from(&path).with_context(|| format!("Cannot load config {}", path.display()))
}

/// Settings for one run.
#[derive(Debug, Clone)]
pub struct RunSettings {
    /// Portal endpoints.
    pub portal: PortalSettings,
    /// Request settings.
    pub fetch: FetchSettings,
    /// Cookie jar location.
    pub cookie_file: PathBuf,
    /// Debug artifact directory.
    pub debug_dir: PathBuf,
    /// JSON export path.
    pub json_path: PathBuf,
    /// CSV export path.
    pub csv_path: PathBuf,
    /// Username, if known.
    pub username: Option<String>,
    /// Password, if known.
    pub password: Option<String>,
    /// Explicit cookie string.
    pub cookie: Option<String>,
}

impl RunSettings {
    /// Merges flags over the config file.
    pub fn resolve(args: &FetchArgs, config: &Config) -> Self {
        let base_url = args
            .base_url
            .clone()
            .unwrap_or_else(|| config.portal.base_url.clone());

        let portal = PortalSettings::from_base(&base_url)
            .login_url(args.login_url.clone().or_else(|| config.portal.login_url.clone()))
            .sso_url(args.sso_url.clone().or_else(|| config.portal.sso_url.clone()))
            .dashboard_url(
                args.dashboard_url
                    .clone()
                    .or_else(|| config.portal.dashboard_url.clone()),
            )
            .resource_url(
                args.resource_url
                    .clone()
                    .or_else(|| config.portal.resource_url.clone()),
            );

        let timeout = args.timeout.unwrap_or(config.network.timeout_secs);
        let mut fetch = FetchSettings::default().with_timeout(Duration::from_secs(timeout));
        fetch.field_style = args.field_style.unwrap_or(config.portal.field_style);
        if args.debug {
            fetch = fetch.with_debug();
        }

        let settings = Self {
            portal,
            fetch,
            cookie_file: args
                .cookie_file
                .clone()
                .unwrap_or_else(|| config.cookie_file_path()),
            debug_dir: args
                .debug_dir
                .clone()
                .unwrap_or_else(|| config.debug_dir_path()),
            json_path: args
                .output_json
                .clone()
                .or_else(|| config.output.json.clone())
                .unwrap_or_else(|| PathBuf::from(DEFAULT_JSON_OUTPUT)),
            csv_path: args
                .output_csv
                .clone()
                .or_else(|| config.output.csv.clone())
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CSV_OUTPUT)),
            username: args
                .user
                .clone()
                .or_else(|| config.credentials.username.clone()),
            password: args
                .password
                .clone()
                .or_else(|| config.credentials.password.clone()),
            cookie: args.cookie.clone(),
        };

        debug!(
            base_url = %settings.portal.base_url,
            timeout_secs = timeout,
            cookie_file = %settings.cookie_file.display(),
            "Resolved run settings"
        );
        settings
    }

    /// Builds the fetch context for the cookie ladder.
    pub fn fetch_context(
        &self,
        credentials: Arc<dyn CredentialProvider>,
        progress: Option<ProgressFn>,
    ) -> FetchContext {
        let mut builder = FetchContext::builder()
            .portal(self.portal.clone())
            .settings(self.fetch.clone())
            .credentials(credentials)
            .explicit_cookie(self.cookie.clone())
            .cookie_file(CookieFile::new(&self.cookie_file))
            .artifacts(ArtifactWriter::new(&self.debug_dir, self.fetch.debug));
        if let Some(progress) = progress {
            builder = builder.progress(progress);
        }
        builder.build()
    }
}
