//! Persisted session cookie jar.
//!
//! The jar is a JSON array of [`Cookie`] records. It is written after a
//! successful login, read opportunistically on the next run, and deleted
//! wholesale when the cookies it holds stop working.

use std::path::{Path, PathBuf};

use sfrhome_core::Cookie;
use tracing::{debug, info, instrument, warn};

use crate::error::StoreError;
use crate::persistence::{default_cookie_path, load_json, remove_file, save_json};

/// A cookie jar file on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieFile {
    path: PathBuf,
}

impl CookieFile {
    /// Creates a handle for the jar at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns a handle for the jar at the default location.
    pub fn default_location() -> Self {
        Self::new(default_cookie_path())
    }

    /// Path of the jar.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns true if the jar exists on disk.
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Loads the unexpired cookies.
    ///
    /// Returns None when the file is missing, unreadable, unparsable or
    /// holds no live cookie.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub async fn load(&self) -> Option<Vec<Cookie>> {
        let cookies: Vec<Cookie> = match load_json(&self.path).await {
            Ok(cookies) => cookies,
            Err(e) if e.is_not_found() => {
                debug!("No cookie file");
                return None;
            }
            Err(e) => {
                warn!(error = %e, "Ignoring unreadable cookie file");
                return None;
            }
        };

        let total = cookies.len();
        let live: Vec<Cookie> = cookies.into_iter().filter(|c| !c.is_expired()).collect();
        debug!(total, live = live.len(), "Loaded cookie file");

        if live.is_empty() { None } else { Some(live) }
    }

    /// Writes the jar atomically with 0o600 permissions.
    #[instrument(skip(self, cookies), fields(path = %self.path.display(), count = cookies.len()))]
    pub async fn save(&self, cookies: &[Cookie]) -> Result<(), StoreError> {
        save_json(&self.path, &cookies).await?;
        info!("Saved session cookies");
        Ok(())
    }

    /// Deletes the jar. A missing file is not an error.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub async fn delete(&self) -> Result<(), StoreError> {
        remove_file(&self.path).await?;
        info!("Deleted cookie file");
        Ok(())
    }
}

impl Default for CookieFile {
    fn default() -> Self {
        Self::default_location()
    }
}

// ============================================================================
// Tests
// ============================================================================
