//! File persistence helpers.
//!
//! The cookie jar holds live session tokens, so everything written here is
//! owner-only: files 0o600, directories created under the config directory
//! 0o700.

use serde::{de::DeserializeOwned, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::StoreError;

const FILE_MODE: u32 = 0o600;
const DIR_MODE: u32 = 0o700;

// ============================================================================
// Default Paths
// ============================================================================

/// Returns the default configuration directory (`~/.config/sfrhome` on
/// Linux, the platform config directory elsewhere).
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .map(|c| c.join("sfrhome"))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns the default config file path.
pub fn default_config_path() -> PathBuf {
    default_config_dir().join("config.json")
}

/// Returns the default cookie jar path.
pub fn default_cookie_path() -> PathBuf {
    default_config_dir().join("cookies.json")
}

// ============================================================================
// Permissions
// ============================================================================

#[cfg(unix)]
async fn restrict(path: &Path, mode: u32) -> Result<(), StoreError> {
    use std::os::unix::fs::PermissionsExt;

    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(mode)).await?;
    debug!(path = %path.display(), mode = %format!("{mode:o}"), "Restricted permissions");
    Ok(())
}

#[cfg(not(unix))]
async fn restrict(_path: &Path, _mode: u32) -> Result<(), StoreError> {
    Ok(())
}

/// Creates the parent directory of `path`. New directories inside the
/// config directory are made owner-only.
async fn prepare_parent(path: &Path) -> Result<(), StoreError> {
    let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) else {
        return Ok(());
    };
    if parent.exists() {
        return Ok(());
    }

    tokio::fs::create_dir_all(parent).await?;

    let config_dir = default_config_dir();
    for dir in parent.ancestors().take_while(|d| d.starts_with(&config_dir)) {
        restrict(dir, DIR_MODE).await?;
    }
    Ok(())
}

// ============================================================================
// JSON Files
// ============================================================================

/// Writes `data` as pretty JSON.
///
/// The content goes to a sibling temp file first and is renamed over
/// `path`, so a crash never leaves a truncated jar behind.
pub async fn save_json<T: Serialize + ?Sized>(path: &Path, data: &T) -> Result<(), StoreError> {
    prepare_parent(path).await?;

    let json = serde_json::to_vec_pretty(data)?;
    let staging = path.with_extension("json.tmp");

    tokio::fs::write(&staging, &json).await?;
    restrict(&staging, FILE_MODE).await?;
    tokio::fs::rename(&staging, path).await?;

    debug!(path = %path.display(), bytes = json.len(), "Saved JSON file");
    Ok(())
}

/// Reads and deserializes a JSON file.
pub async fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T, StoreError> {
    let raw = tokio::fs::read(path).await?;
    debug!(path = %path.display(), bytes = raw.len(), "Read JSON file");
    Ok(serde_json::from_slice(&raw)?)
}

/// Removes a file. A missing file is not an error.
pub async fn remove_file(path: &Path) -> Result<(), StoreError> {
    match tokio::fs::remove_file(path).await {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
        _ => Ok(()),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_paths() {
        assert!(default_config_path().ends_with("sfrhome/config.json"));
        assert!(default_cookie_path().ends_with("sfrhome/cookies.json"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_saved_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("cookies.json");

        save_json(&path, &serde_json::json!([])).await.unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, FILE_MODE);
        assert!(!path.with_extension("json.tmp").exists());
    }
}
