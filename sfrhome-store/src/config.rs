//! Configuration management.
//!
//! The config file is optional. Every field has a default, and the CLI
//! layers environment variables and flags on top of it.

use crate::error::StoreError;
use crate::persistence::{default_config_path, default_cookie_path};
use serde::{Deserialize, Serialize};
use sfrhome_core::SsoFieldStyle;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Default portal base URL.
pub const DEFAULT_BASE_URL: &str = "https://home.sfr.fr";

/// Default per-request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 20;

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Portal endpoints.
    #[serde(default)]
    pub portal: PortalConfig,
    /// Network settings.
    #[serde(default)]
    pub network: NetworkConfig,
    /// Output locations.
    #[serde(default)]
    pub output: OutputConfig,
    /// Stored credentials.
    #[serde(default)]
    pub credentials: CredentialsConfig,
}

/// Portal endpoint overrides. Unset URLs are derived from `base_url`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortalConfig {
    /// Base URL of the portal.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Login page URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub login_url: Option<String>,
    /// SSO token endpoint URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sso_url: Option<String>,
    /// Dashboard URL used for the warm-up request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dashboard_url: Option<String>,
    /// Device list URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_url: Option<String>,
    /// Field names for the SSO token request.
    #[serde(default)]
    pub field_style: SsoFieldStyle,
}

/// Network settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Output file locations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// JSON export path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json: Option<PathBuf>,
    /// CSV export path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub csv: Option<PathBuf>,
    /// Cookie jar path (defaults to the config directory).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookie_file: Option<PathBuf>,
    /// Directory for debug artifacts (defaults to the working directory).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug_dir: Option<PathBuf>,
}

/// Stored credentials.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialsConfig {
    /// Portal username.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Portal password.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            login_url: None,
            sso_url: None,
            dashboard_url: None,
            resource_url: None,
            field_style: SsoFieldStyle::default(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            portal: PortalConfig::default(),
            network: NetworkConfig::default(),
            output: OutputConfig::default(),
            credentials: CredentialsConfig::default(),
        }
    }
}

impl Config {
    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        default_config_path()
    }

    /// Loads configuration from the default path.
    pub fn load() -> Result<Self, StoreError> {
        Self::load_from(&Self::default_path())
    }

    /// Loads configuration from a specific path. A missing file gives the
    /// defaults.
    pub fn load_from(path: &Path) -> Result<Self, StoreError> {
        if !path.exists() {
            debug!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;

        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Saves configuration to the default path.
    pub fn save(&self) -> Result<(), StoreError> {
        self.save_to(&Self::default_path())
    }

    /// Saves configuration to a specific path, owner-readable only.
    pub fn save_to(&self, path: &Path) -> Result<(), StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
        }

        info!(path = %path.display(), "Saved configuration");
        Ok(())
    }

    /// Checks values that serde cannot.
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.network.timeout_secs == 0 {
            return Err(StoreError::Config("timeout_secs must be positive".into()));
        }
        if self.portal.base_url.trim().is_empty() {
            return Err(StoreError::Config("base_url must not be empty".into()));
        }
        Ok(())
    }

    /// Cookie jar path, falling back to the default location.
    pub fn cookie_file_path(&self) -> PathBuf {
        self.output
            .cookie_file
            .clone()
            .unwrap_or_else(default_cookie_path)
    }

    /// Debug artifact directory, falling back to the working directory.
    pub fn debug_dir_path(&self) -> PathBuf {
        self.output
            .debug_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join("none.json")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.portal.base_url, "https://home.sfr.fr");
        assert_eq!(config.network.timeout_secs, 20);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"portal": {"field_style": "plain"}, "credentials": {"username": "me"}}"#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.portal.field_style, SsoFieldStyle::Plain);
        assert_eq!(config.portal.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.credentials.username.as_deref(), Some("me"));
        assert_eq!(config.network.timeout_secs, DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"network": {"timeout_secs": 0}}"#).unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(StoreError::Config(_))
        ));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let mut config = Config::default();
        config.output.csv = Some(PathBuf::from("devices.csv"));

        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_path_fallbacks() {
        let config = Config::default();
        assert!(config.cookie_file_path().ends_with("cookies.json"));
        assert_eq!(config.debug_dir_path(), PathBuf::from("."));
    }
}
