//! Debug artifact writer.
//!
//! Debug dumps (`debug_*.html`, `debug_*.xml`, ...) are only written when
//! debug mode is on. Error bodies are always written so that a failed run
//! can be diagnosed after the fact. Write failures never fail the fetch.

use std::path::{Path, PathBuf};

use reqwest::header::HeaderMap;
use sfrhome_core::Cookie;
use tracing::{debug, warn};

/// Writes diagnostic files into a directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactWriter {
    dir: PathBuf,
    debug: bool,
}

impl ArtifactWriter {
    /// Creates a writer for `dir`. Debug dumps are written only when
    /// `debug` is true.
    pub fn new(dir: impl Into<PathBuf>, debug: bool) -> Self {
        Self {
            dir: dir.into(),
            debug,
        }
    }

    /// Target directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns true if debug dumps are enabled.
    pub fn is_debug(&self) -> bool {
        self.debug
    }

    /// Writes a debug dump named `name` (debug mode only).
    pub async fn dump(&self, name: &str, contents: impl AsRef<[u8]>) -> Option<PathBuf> {
        if !self.debug {
            return None;
        }
        self.write(name, contents.as_ref()).await
    }

    /// Writes the body of a failed step as `debug_<step>_error.html`.
    pub async fn error_body(&self, step: &str, body: impl AsRef<[u8]>) -> Option<PathBuf> {
        self.write(&format!("debug_{step}_error.html"), body.as_ref())
            .await
    }

    /// Writes a masked cookie dump (debug mode only).
    pub async fn dump_cookies(&self, cookies: &[Cookie]) -> Option<PathBuf> {
        self.dump("debug_cookies.txt", format_cookie_dump(cookies))
            .await
    }

    /// Writes a status line plus response headers (debug mode only).
    pub async fn dump_headers(&self, name: &str, status: u16, headers: &HeaderMap) -> Option<PathBuf> {
        self.dump(name, format_headers(status, headers)).await
    }

    async fn write(&self, name: &str, contents: &[u8]) -> Option<PathBuf> {
        let path = self.dir.join(name);
        if let Err(e) = tokio::fs::create_dir_all(&self.dir).await {
            warn!(dir = %self.dir.display(), error = %e, "Cannot create debug directory");
            return None;
        }
        match tokio::fs::write(&path, contents).await {
            Ok(()) => {
                debug!(path = %path.display(), bytes = contents.len(), "Wrote artifact");
                Some(path)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to write artifact");
                None
            }
        }
    }
}

/// One line per cookie with the value masked.
pub fn format_cookie_dump(cookies: &[Cookie]) -> String {
    cookies
        .iter()
        .map(|c| {
            format!(
                "{}={} ; domain={} ; path={} ; expires={}\n",
                c.name,
                c.masked_value(),
                c.domain,
                c.path,
                c.expires.map_or_else(|| "session".to_string(), |e| e.to_rfc3339()),
            )
        })
        .collect()
}

/// Status line followed by `name: value` header lines. `set-cookie`
/// values are masked.
pub fn format_headers(status: u16, headers: &HeaderMap) -> String {
    let mut out = format!("HTTP {status}\n");
    for (name, value) in headers {
        let value = value.to_str().unwrap_or("<binary>");
        if name == reqwest::header::SET_COOKIE {
            let cookie_name = value.split('=').next().unwrap_or_default();
            out.push_str(&format!("{name}: {cookie_name}=***\n"));
        } else {
            out.push_str(&format!("{name}: {value}\n"));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderValue, CONTENT_TYPE, SET_COOKIE};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_dump_only_in_debug_mode() {
        let dir = TempDir::new().unwrap();

        let quiet = ArtifactWriter::new(dir.path(), false);
        assert_eq!(quiet.dump("debug_login.html", "<html/>").await, None);
        assert!(!dir.path().join("debug_login.html").exists());

        let verbose = ArtifactWriter::new(dir.path(), true);
        let path = verbose.dump("debug_login.html", "<html/>").await.unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "<html/>");
    }

    #[tokio::test]
    async fn test_error_body_always_written() {
        let dir = TempDir::new().unwrap();
        let writer = ArtifactWriter::new(dir.path().join("sub"), false);

        let path = writer.error_body("mysensors", "denied").await.unwrap();
        assert!(path.ends_with("debug_mysensors_error.html"));
        assert_eq!(std::fs::read_to_string(path).unwrap(), "denied");
    }

    #[test]
    fn test_cookie_dump_masks_values() {
        let dump = format_cookie_dump(&[Cookie::new("sid", "0123456789abcdef", "home.sfr.fr")]);
        assert!(dump.starts_with("sid=012345..."));
        assert!(!dump.contains("abcdef"));
        assert!(dump.contains("expires=session"));
    }

    #[test]
    fn test_headers_mask_set_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/html"));
        headers.insert(SET_COOKIE, HeaderValue::from_static("sid=secret; Path=/"));

        let out = format_headers(302, &headers);
        assert!(out.starts_with("HTTP 302\n"));
        assert!(out.contains("content-type: text/html"));
        assert!(out.contains("set-cookie: sid=***"));
        assert!(!out.contains("secret"));
    }
}
