//! HTTP session with a cookie jar.
//!
//! A [`PortalSession`] owns one reqwest client and the cookie jar wired
//! into it. Every strategy builds its own session, so a failed attempt
//! never leaks cookies into the next one.

use std::sync::{Arc, PoisonError};
use std::time::Duration;

use chrono::DateTime;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::{Client, Response};
use cookie_store::CookieStore;
use reqwest_cookie_store::CookieStoreMutex;
use sfrhome_core::Cookie;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::context::FetchContext;
use crate::error::FetchError;

// ============================================================================
// Portal Session
// ============================================================================

/// An HTTP client plus the cookie jar it reads and writes.
#[derive(Clone)]
pub struct PortalSession {
    inner: Client,
    jar: Arc<CookieStoreMutex>,
    base_url: Url,
    timeout_secs: u64,
}

impl PortalSession {
    /// Creates a session with an empty jar.
    ///
    /// # Errors
    ///
    /// Fails when the base URL does not parse or the client cannot be
    /// built.
    pub fn new(base_url: &str, timeout: Duration, user_agent: &str) -> Result<Self, FetchError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| FetchError::InvalidUrl(format!("{base_url}: {e}")))?;

        let jar = Arc::new(CookieStoreMutex::new(CookieStore::default()));

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));

        let inner = Client::builder()
            .cookie_provider(Arc::clone(&jar))
            .timeout(timeout)
            .user_agent(user_agent)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            inner,
            jar,
            base_url,
            timeout_secs: timeout.as_secs(),
        })
    }

    /// Creates a session configured from a fetch context.
    pub fn from_context(ctx: &FetchContext) -> Result<Self, FetchError> {
        Self::new(
            &ctx.portal.base_url,
            ctx.settings.timeout,
            &ctx.settings.user_agent,
        )
    }

    /// Host of the base URL.
    pub fn host(&self) -> &str {
        self.base_url.host_str().unwrap_or_default()
    }

    /// Base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ========================================================================
    // Requests
    // ========================================================================

    /// Performs a GET request with extra headers.
    #[instrument(skip(self, headers), fields(url = %url))]
    pub async fn get(&self, url: &str, headers: HeaderMap) -> Result<Response, FetchError> {
        debug!("GET request");

        let response = self
            .inner
            .get(url)
            .headers(headers)
            .send()
            .await
            .map_err(|e| FetchError::from_request(e, self.timeout_secs))?;
        debug!(status = %response.status(), final_url = %response.url(), "Response received");
        Ok(response)
    }

    /// Performs a POST request with form data and extra headers.
    #[instrument(skip(self, form, headers), fields(url = %url))]
    pub async fn post_form<T: serde::Serialize + ?Sized>(
        &self,
        url: &str,
        form: &T,
        headers: HeaderMap,
    ) -> Result<Response, FetchError> {
        debug!("POST request with form data");

        let response = self
            .inner
            .post(url)
            .headers(headers)
            .form(form)
            .send()
            .await
            .map_err(|e| FetchError::from_request(e, self.timeout_secs))?;
        debug!(status = %response.status(), final_url = %response.url(), "Response received");
        Ok(response)
    }

    /// Reads a response body, mapping timeouts.
    pub async fn body(&self, response: Response) -> Result<Vec<u8>, FetchError> {
        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::from_request(e, self.timeout_secs))?;
        Ok(bytes.to_vec())
    }

    // ========================================================================
    // Cookie Jar
    // ========================================================================

    /// Loads cookies into the jar.
    ///
    /// Cookies for the base host are stored host-only; cookies for other
    /// domains keep their domain attribute. Cookies the jar refuses are
    /// logged and skipped.
    pub fn import_cookies(&self, cookies: &[Cookie]) {
        let host = self.host().to_string();
        let mut store = self.jar.lock().unwrap_or_else(PoisonError::into_inner);

        for cookie in cookies {
            let mut raw = cookie_store::RawCookie::new(cookie.name.clone(), cookie.value.clone());
            raw.set_path(if cookie.path.is_empty() { "/".to_string() } else { cookie.path.clone() });

            let domain = cookie.domain.trim_start_matches('.');
            if !domain.is_empty() && domain != host {
                raw.set_domain(cookie.domain.clone());
            }

            if let Err(e) = store.insert_raw(&raw, &self.base_url) {
                warn!(cookie = %cookie.name, error = %e, "Cookie rejected by jar");
            }
        }
        debug!(count = cookies.len(), "Imported cookies");
    }

    /// Returns the live cookies of the jar.
    pub fn export_cookies(&self) -> Vec<Cookie> {
        let host = self.host().to_string();
        let store = self.jar.lock().unwrap_or_else(PoisonError::into_inner);

        store
            .iter_unexpired()
            .map(|c| {
                let expires = match c.expires {
                    cookie_store::CookieExpiration::AtUtc(at) => {
                        DateTime::from_timestamp(at.unix_timestamp(), 0)
                    }
                    cookie_store::CookieExpiration::SessionEnd => None,
                };
                Cookie {
                    name: c.name().to_string(),
                    value: c.value().to_string(),
                    domain: c
                        .domain()
                        .map_or_else(|| host.clone(), |d| d.trim_start_matches('.').to_string()),
                    path: c.path().unwrap_or("/").to_string(),
                    expires,
                }
            })
            .collect()
    }
}

impl std::fmt::Debug for PortalSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortalSession")
            .field("base_url", &self.base_url.as_str())
            .field("timeout_secs", &self.timeout_secs)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================
