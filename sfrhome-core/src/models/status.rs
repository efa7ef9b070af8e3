//! Fetch-related types.
//!
//! - [`FetchSource`] - How a device snapshot was obtained
//! - [`SsoFieldStyle`] - Field names used by the SSO token request

use serde::{Deserialize, Serialize};

// ============================================================================
// Fetch Source
// ============================================================================

/// How the device data was fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FetchSource {
    /// Via a cookie string supplied on the command line or environment.
    ExplicitCookie,
    /// Via cookies persisted by a previous run.
    StoredCookie,
    /// Via the full SSO login flow.
    #[default]
    Sso,
    /// Via a local XML file (no network).
    LocalFile,
}

impl FetchSource {
    /// Returns a human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::ExplicitCookie => "Explicit cookie",
            Self::StoredCookie => "Stored cookie",
            Self::Sso => "SSO",
            Self::LocalFile => "Local file",
        }
    }

    /// Returns a description of this fetch source.
    pub fn description(&self) -> &'static str {
        match self {
            Self::ExplicitCookie => "Via a session cookie passed by the caller",
            Self::StoredCookie => "Via cookies saved by a previous login",
            Self::Sso => "Via a fresh SSO login",
            Self::LocalFile => "Via a local XML dump",
        }
    }

    /// Returns all fetch sources.
    pub fn all() -> &'static [FetchSource] {
        &[
            Self::ExplicitCookie,
            Self::StoredCookie,
            Self::Sso,
            Self::LocalFile,
        ]
    }
}

impl std::fmt::Display for FetchSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

// ============================================================================
// SSO Field Style
// ============================================================================

/// Form field names used when posting credentials to the SSO endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SsoFieldStyle {
    /// `connectionSFR` / `passSFR`, as the portal's own login page sends.
    #[default]
    Vendor,
    /// `username` / `password`.
    Plain,
}

impl SsoFieldStyle {
    /// Returns the (user, password) field names.
    pub fn field_names(&self) -> (&'static str, &'static str) {
        match self {
            Self::Vendor => ("connectionSFR", "passSFR"),
            Self::Plain => ("username", "password"),
        }
    }
}

impl std::str::FromStr for SsoFieldStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "vendor" | "sfr" => Ok(Self::Vendor),
            "plain" => Ok(Self::Plain),
            other => Err(format!("unknown SSO field style: {other}")),
        }
    }
}

impl std::fmt::Display for SsoFieldStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Vendor => write!(f, "vendor"),
            Self::Plain => write!(f, "plain"),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
