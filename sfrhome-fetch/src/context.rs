//! Fetch context shared by all strategies.
//!
//! The fetch context bundles the portal endpoints, request settings, the
//! credential source, the cookie jar file and the debug artifact writer.
//! Everything a strategy touches comes from here, so tests can point the
//! whole flow at a mock server.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use sfrhome_core::SsoFieldStyle;
use sfrhome_store::{CookieFile, DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS};
use tracing::warn;

use crate::host::artifacts::ArtifactWriter;

/// User agent sent on every request.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64)";

// ============================================================================
// Portal Settings
// ============================================================================

/// Portal endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortalSettings {
    /// Base URL, without trailing slash.
    pub base_url: String,
    /// Login page.
    pub login_url: String,
    /// SSO token endpoint.
    pub sso_url: String,
    /// Dashboard page used for the warm-up request.
    pub dashboard_url: String,
    /// Device list.
    pub resource_url: String,
}

impl PortalSettings {
    /// Derives every endpoint from a base URL.
    pub fn from_base(base: &str) -> Self {
        let base = base.trim().trim_end_matches('/').to_string();
        Self {
            login_url: format!("{base}/login"),
            sso_url: format!("{base}/sso-connector.php"),
            dashboard_url: format!("{base}/accueil"),
            resource_url: format!("{base}/mysensors"),
            base_url: base,
        }
    }

    /// Overrides the login URL when `url` is set.
    #[must_use]
    pub fn login_url(mut self, url: Option<String>) -> Self {
        if let Some(url) = url {
            self.login_url = url;
        }
        self
    }

    /// Overrides the SSO URL when `url` is set.
    #[must_use]
    pub fn sso_url(mut self, url: Option<String>) -> Self {
        if let Some(url) = url {
            self.sso_url = url;
        }
        self
    }

    /// Overrides the dashboard URL when `url` is set.
    #[must_use]
    pub fn dashboard_url(mut self, url: Option<String>) -> Self {
        if let Some(url) = url {
            self.dashboard_url = url;
        }
        self
    }

    /// Overrides the device list URL when `url` is set.
    #[must_use]
    pub fn resource_url(mut self, url: Option<String>) -> Self {
        if let Some(url) = url {
            self.resource_url = url;
        }
        self
    }

    /// Referer used for cookie-based fetches (the portal root).
    pub fn root_referer(&self) -> String {
        format!("{}/", self.base_url)
    }
}

impl Default for PortalSettings {
    fn default() -> Self {
        Self::from_base(DEFAULT_BASE_URL)
    }
}

// ============================================================================
// Fetch Settings
// ============================================================================

/// Settings for fetch operations.
#[derive(Debug, Clone)]
pub struct FetchSettings {
    /// Timeout for each request.
    pub timeout: Duration,
    /// Whether to dump every response for debugging.
    pub debug: bool,
    /// Field names for the SSO token request.
    pub field_style: SsoFieldStyle,
    /// User agent header.
    pub user_agent: String,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            debug: false,
            field_style: SsoFieldStyle::default(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl FetchSettings {
    /// Creates settings with custom timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Creates settings with debug dumps enabled.
    #[must_use]
    pub fn with_debug(mut self) -> Self {
        self.debug = true;
        self
    }

    /// Timeout in whole seconds, for error messages.
    pub fn timeout_secs(&self) -> u64 {
        self.timeout.as_secs()
    }
}

// ============================================================================
// Credentials
// ============================================================================

/// Portal credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Username (usually an email address).
    pub username: String,
    /// Password.
    pub password: String,
}

impl Credentials {
    /// Creates credentials.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Source of credentials, queried only when an SSO login is needed.
pub trait CredentialProvider: Send + Sync {
    /// Returns credentials, or None when none are available.
    fn credentials(&self) -> Option<Credentials>;
}

/// Fixed credentials (or none).
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials(Option<Credentials>);

impl StaticCredentials {
    /// Creates a provider that always returns `credentials`.
    pub fn new(credentials: Credentials) -> Self {
        Self(Some(credentials))
    }

    /// Creates a provider with no credentials.
    pub fn none() -> Self {
        Self(None)
    }
}

impl CredentialProvider for StaticCredentials {
    fn credentials(&self) -> Option<Credentials> {
        self.0.clone()
    }
}

// ============================================================================
// Progress
// ============================================================================

/// Callback receiving user-facing progress markers.
pub type ProgressFn = Arc<dyn Fn(&str) + Send + Sync>;

// ============================================================================
// Fetch Context
// ============================================================================

/// Context provided to fetch strategies.
pub struct FetchContext {
    /// Portal endpoints.
    pub portal: PortalSettings,
    /// Fetch settings.
    pub settings: FetchSettings,
    /// Credential source for SSO.
    pub credentials: Arc<dyn CredentialProvider>,
    /// Cookie string supplied by the caller.
    pub explicit_cookie: Option<String>,
    /// Persisted cookie jar.
    pub cookie_file: CookieFile,
    /// Debug artifact writer.
    pub artifacts: ArtifactWriter,
    progress: Option<ProgressFn>,
}

impl FetchContext {
    /// Creates a new fetch context with default settings.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Creates a builder for customizing the context.
    pub fn builder() -> FetchContextBuilder {
        FetchContextBuilder::new()
    }

    /// Returns the effective timeout for each request.
    pub fn timeout(&self) -> Duration {
        self.settings.timeout
    }

    /// Returns the explicit cookie string, if a non-blank one was supplied.
    pub fn explicit_cookie(&self) -> Option<&str> {
        self.explicit_cookie
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }

    /// Emits a progress marker.
    pub fn progress(&self, message: &str) {
        if let Some(progress) = &self.progress {
            progress(message);
        }
    }
}

impl Default for FetchContext {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FetchContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchContext")
            .field("portal", &self.portal)
            .field("settings", &self.settings)
            .field("explicit_cookie", &self.explicit_cookie.is_some())
            .field("cookie_file", &self.cookie_file)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Fetch Context Builder
// ============================================================================

/// Builder for constructing a `FetchContext`.
pub struct FetchContextBuilder {
    portal: PortalSettings,
    settings: FetchSettings,
    credentials: Option<Arc<dyn CredentialProvider>>,
    explicit_cookie: Option<String>,
    cookie_file: Option<CookieFile>,
    artifacts: Option<ArtifactWriter>,
    progress: Option<ProgressFn>,
}

impl FetchContextBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self {
            portal: PortalSettings::default(),
            settings: FetchSettings::default(),
            credentials: None,
            explicit_cookie: None,
            cookie_file: None,
            artifacts: None,
            progress: None,
        }
    }

    /// Sets the portal endpoints.
    #[must_use]
    pub fn portal(mut self, portal: PortalSettings) -> Self {
        self.portal = portal;
        self
    }

    /// Sets the fetch settings.
    #[must_use]
    pub fn settings(mut self, settings: FetchSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Sets the timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.settings.timeout = timeout;
        self
    }

    /// Sets the credential provider.
    #[must_use]
    pub fn credentials(mut self, credentials: Arc<dyn CredentialProvider>) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Sets the explicit cookie string.
    #[must_use]
    pub fn explicit_cookie(mut self, cookie: Option<String>) -> Self {
        self.explicit_cookie = cookie;
        self
    }

    /// Sets the cookie jar file.
    #[must_use]
    pub fn cookie_file(mut self, cookie_file: CookieFile) -> Self {
        self.cookie_file = Some(cookie_file);
        self
    }

    /// Sets the artifact writer.
    #[must_use]
    pub fn artifacts(mut self, artifacts: ArtifactWriter) -> Self {
        self.artifacts = Some(artifacts);
        self
    }

    /// Sets the progress callback.
    #[must_use]
    pub fn progress(mut self, progress: ProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Builds the fetch context.
    pub fn build(self) -> FetchContext {
        if self.settings.debug {
            warn!("Debug dumps enabled: responses and masked cookies will be written to disk");
        }

        let artifacts = self
            .artifacts
            .unwrap_or_else(|| ArtifactWriter::new(".", self.settings.debug));

        FetchContext {
            portal: self.portal,
            credentials: self
                .credentials
                .unwrap_or_else(|| Arc::new(StaticCredentials::none())),
            explicit_cookie: self.explicit_cookie,
            cookie_file: self.cookie_file.unwrap_or_default(),
            artifacts,
            progress: self.progress,
            settings: self.settings,
        }
    }
}

impl Default for FetchContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================
