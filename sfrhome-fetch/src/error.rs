//! Fetch error types.

use std::path::PathBuf;
use thiserror::Error;

// ============================================================================
// Error Class
// ============================================================================

/// Coarse classification of a [`FetchError`], used for exit codes and
/// fallback decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The run is misconfigured (missing credentials, bad URL).
    Configuration,
    /// The portal no longer looks the way the login flow expects.
    ProtocolDrift,
    /// Network, status or session errors that another attempt may fix.
    Transient,
}

// ============================================================================
// Main Fetch Error
// ============================================================================

/// Error type for fetch operations.
#[derive(Debug, Error)]
pub enum FetchError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Request timed out.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// A step answered with a non-success status.
    #[error("{step} failed with HTTP {status}{}", artifact_suffix(.artifact.as_ref()))]
    HttpStatus {
        /// Step name (`sso`, `login`, `dashboard`, ...).
        step: String,
        /// HTTP status code.
        status: u16,
        /// Where the response body was saved.
        artifact: Option<PathBuf>,
    },

    /// The portal's answer lacks something the login flow needs.
    #[error("{step}: {reason}{}", artifact_suffix(.artifact.as_ref()))]
    ProtocolDrift {
        /// Step name.
        step: String,
        /// What was missing.
        reason: String,
        /// Where the response body was saved.
        artifact: Option<PathBuf>,
    },

    /// The portal did not accept the session (login page or garbage
    /// returned instead of the device list).
    #[error("Session rejected: {0}")]
    SessionRejected(String),

    /// SSO login is required but no credentials were supplied.
    #[error("Missing credentials: a username and password are required for SSO login")]
    MissingCredentials,

    /// A configured URL is invalid.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Store error.
    #[error("Store error: {0}")]
    Store(#[from] sfrhome_store::StoreError),

    /// Strategy not available.
    #[error("Strategy not available: {0}")]
    StrategyNotAvailable(String),

    /// All strategies failed.
    #[error("All strategies failed")]
    AllStrategiesFailed,
}

fn artifact_suffix(artifact: Option<&PathBuf>) -> String {
    artifact
        .map(|p| format!(" (response saved to {})", p.display()))
        .unwrap_or_default()
}

impl FetchError {
    /// Maps a reqwest error, turning timeouts into [`FetchError::Timeout`].
    pub fn from_request(error: reqwest::Error, timeout_secs: u64) -> Self {
        if error.is_timeout() {
            Self::Timeout(timeout_secs)
        } else {
            Self::Http(error)
        }
    }

    /// Creates a protocol drift error.
    pub fn drift(step: impl Into<String>, reason: impl Into<String>, artifact: Option<PathBuf>) -> Self {
        Self::ProtocolDrift {
            step: step.into(),
            reason: reason.into(),
            artifact,
        }
    }

    /// Returns the error class.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::MissingCredentials | Self::InvalidUrl(_) => ErrorClass::Configuration,
            Self::ProtocolDrift { .. } => ErrorClass::ProtocolDrift,
            _ => ErrorClass::Transient,
        }
    }

    /// Returns the diagnostic artifact attached to this error, if any.
    pub fn artifact(&self) -> Option<&PathBuf> {
        match self {
            Self::HttpStatus { artifact, .. } | Self::ProtocolDrift { artifact, .. } => {
                artifact.as_ref()
            }
            _ => None,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classes() {
        assert_eq!(FetchError::MissingCredentials.class(), ErrorClass::Configuration);
        assert_eq!(
            FetchError::drift("sso", "token_sso missing", None).class(),
            ErrorClass::ProtocolDrift
        );
        assert_eq!(FetchError::Timeout(20).class(), ErrorClass::Transient);
        assert_eq!(
            FetchError::SessionRejected("html".into()).class(),
            ErrorClass::Transient
        );
    }

    #[test]
    fn test_status_message_names_step_and_artifact() {
        let err = FetchError::HttpStatus {
            step: "mysensors".into(),
            status: 403,
            artifact: Some(PathBuf::from("debug_mysensors_error.html")),
        };
        let msg = err.to_string();
        assert!(msg.contains("mysensors"));
        assert!(msg.contains("403"));
        assert!(msg.contains("debug_mysensors_error.html"));
        assert!(err.artifact().is_some());
    }
}
