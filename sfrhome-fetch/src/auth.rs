//! SSO login flow.
//!
//! Establishing a portal session takes three strictly ordered requests:
//!
//! 1. **Token exchange**: credentials are posted to the SSO connector,
//!    which answers with JSON carrying `result.token_sso`.
//! 2. **Form replay**: the login page is fetched, its login form is
//!    copied field by field, the token is injected and the form submitted.
//! 3. **Dashboard warm-up**: the dashboard is opened so the portal
//!    finishes setting its session cookies. The final URL after redirects
//!    becomes the referer of the device list request.
//!
//! Each step short-circuits on failure. Bodies are kept as debug artifacts.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ORIGIN, REFERER};
use reqwest::Response;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::context::{Credentials, FetchContext};
use crate::error::FetchError;
use crate::host::session::PortalSession;

/// Login form ids, in lookup order.
pub const LOGIN_FORM_IDS: &[&str] = &["login_form_add_rib", "loginForm"];

/// Field receiving the SSO token.
pub const TOKEN_FIELD: &str = "token_sso";

// ============================================================================
// Login Form
// ============================================================================

/// HTTP method of a login form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormMethod {
    /// Fields sent as a query string.
    Get,
    /// Fields sent as an urlencoded body.
    #[default]
    Post,
}

/// A login form extracted from the login page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginForm {
    /// Id of the matched form.
    pub id: String,
    /// Absolute submit URL.
    pub action: Url,
    /// Submit method.
    pub method: FormMethod,
    /// Fields in document order.
    pub fields: Vec<(String, String)>,
}

impl LoginForm {
    /// Returns a field value.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Sets a field, replacing an existing one or appending.
    pub fn set_field(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.fields.iter_mut().find(|(n, _)| n == name) {
            Some((_, v)) => *v = value,
            None => self.fields.push((name.to_string(), value)),
        }
    }

    /// Fills `name` only if the form exposes it and it is empty.
    pub fn backfill(&mut self, name: &str, value: &str) {
        if self.field(name).is_some_and(str::is_empty) {
            self.set_field(name, value);
        }
    }

    /// Injects the SSO token and backfills the identity fields.
    pub fn prepare(&mut self, token: &str, credentials: &Credentials) {
        self.set_field(TOKEN_FIELD, token);
        self.backfill("email", &credentials.username);
        self.backfill("passwd", &credentials.password);
    }
}

/// Finds the login form in `html` and resolves its action against
/// `login_url`.
///
/// Named inputs are copied with their value (checkboxes and radios only
/// when checked). The first named submit control is included. Returns
/// None when no known form is present.
pub fn extract_login_form(html: &str, login_url: &Url) -> Option<LoginForm> {
    let document = Html::parse_document(html);

    let form = LOGIN_FORM_IDS.iter().find_map(|id| {
        let selector = Selector::parse(&format!("form#{id}")).ok()?;
        document.select(&selector).next().map(|f| (*id, f))
    });
    let (id, form) = form?;

    let method = match form.value().attr("method") {
        Some(m) if m.trim().eq_ignore_ascii_case("get") => FormMethod::Get,
        _ => FormMethod::Post,
    };

    let action = form
        .value()
        .attr("action")
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .and_then(|a| login_url.join(a).ok())
        .unwrap_or_else(|| login_url.clone());

    let mut fields = Vec::new();
    let mut submit: Option<(String, String)> = None;

    let controls = Selector::parse("input[name], button[name]").ok()?;
    for el in form.select(&controls) {
        let Some(name) = el.value().attr("name").filter(|n| !n.is_empty()) else {
            continue;
        };
        let value = el.value().attr("value").unwrap_or_default().to_string();

        if is_submit_control(&el) {
            if submit.is_none() {
                submit = Some((name.to_string(), value));
            }
            continue;
        }

        let kind = input_type(&el);
        if kind == "button" || kind == "reset" || kind == "image" {
            continue;
        }
        if (kind == "checkbox" || kind == "radio") && el.value().attr("checked").is_none() {
            continue;
        }
        fields.push((name.to_string(), value));
    }

    fields.extend(submit);

    debug!(id, action = %action, fields = fields.len(), "Extracted login form");
    Some(LoginForm {
        id: id.to_string(),
        action,
        method,
        fields,
    })
}

fn input_type(el: &ElementRef<'_>) -> String {
    el.value()
        .attr("type")
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

fn is_submit_control(el: &ElementRef<'_>) -> bool {
    let kind = input_type(el);
    match el.value().name() {
        "button" => kind.is_empty() || kind == "submit",
        _ => kind == "submit",
    }
}

// ============================================================================
// Flow
// ============================================================================

/// Outcome of a successful login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedSession {
    /// Final dashboard URL, used as the referer of the device list fetch.
    pub referer: String,
}

/// Runs the full SSO login on `session`.
#[instrument(skip_all, fields(user = %credentials.username))]
pub async fn login(
    session: &PortalSession,
    ctx: &FetchContext,
    credentials: &Credentials,
) -> Result<AuthenticatedSession, FetchError> {
    ctx.progress("Step 1/4: requesting SSO token");
    let token = request_sso_token(session, ctx, credentials).await?;

    ctx.progress("Step 2/4: submitting login form");
    submit_login_form(session, ctx, &token, credentials).await?;

    ctx.progress("Step 3/4: opening dashboard");
    let referer = warm_up_dashboard(session, ctx).await?;

    info!("SSO login complete");
    Ok(AuthenticatedSession { referer })
}

/// Posts credentials to the SSO connector and returns `token_sso`.
pub async fn request_sso_token(
    session: &PortalSession,
    ctx: &FetchContext,
    credentials: &Credentials,
) -> Result<String, FetchError> {
    let (user_field, pass_field) = ctx.settings.field_style.field_names();
    let form = [
        (user_field, credentials.username.as_str()),
        (pass_field, credentials.password.as_str()),
    ];

    let headers = browser_headers(session, &ctx.portal.login_url);
    let response = session.post_form(&ctx.portal.sso_url, &form, headers).await?;
    let body = checked_body(session, ctx, "sso", response).await?;
    ctx.artifacts.dump("debug_sso.json", &body).await;

    match parse_sso_token(&body) {
        Some(token) => {
            debug!("Received SSO token");
            Ok(token)
        }
        None => {
            let artifact = ctx.artifacts.error_body("sso", &body).await;
            Err(FetchError::drift("sso", "token_sso missing from SSO response", artifact))
        }
    }
}

/// Extracts `result.token_sso` from the SSO response body.
pub fn parse_sso_token(body: &[u8]) -> Option<String> {
    let json: Value = serde_json::from_slice(body).ok()?;
    match json.get("result")?.get(TOKEN_FIELD)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Fetches the login page, replays its form with the token and submits it.
pub async fn submit_login_form(
    session: &PortalSession,
    ctx: &FetchContext,
    token: &str,
    credentials: &Credentials,
) -> Result<(), FetchError> {
    let login_url = Url::parse(&ctx.portal.login_url)
        .map_err(|e| FetchError::InvalidUrl(format!("{}: {e}", ctx.portal.login_url)))?;

    let response = session
        .get(login_url.as_str(), browser_headers(session, login_url.as_str()))
        .await?;
    let body = checked_body(session, ctx, "login", response).await?;
    ctx.artifacts.dump("debug_login.html", &body).await;

    let html = String::from_utf8_lossy(&body);
    let Some(mut form) = extract_login_form(&html, &login_url) else {
        let artifact = ctx.artifacts.error_body("login", &body).await;
        return Err(FetchError::drift("login", "login form not found", artifact));
    };
    form.prepare(token, credentials);

    let headers = browser_headers(session, login_url.as_str());
    let response = match form.method {
        FormMethod::Post => {
            session
                .post_form(form.action.as_str(), &form.fields, headers)
                .await?
        }
        FormMethod::Get => {
            let mut url = form.action.clone();
            url.query_pairs_mut().extend_pairs(&form.fields);
            session.get(url.as_str(), headers).await?
        }
    };

    let status = response.status().as_u16();
    let response_headers = response.headers().clone();
    debug!(status, final_url = %response.url(), "Login form submitted");

    let body = checked_body(session, ctx, "login_submit", response).await?;
    ctx.artifacts.dump("debug_login_submit.html", &body).await;
    ctx.artifacts
        .dump_headers("debug_login_submit_headers.txt", status, &response_headers)
        .await;
    ctx.artifacts.dump_cookies(&session.export_cookies()).await;

    Ok(())
}

/// Opens the dashboard and returns the final URL after redirects.
pub async fn warm_up_dashboard(
    session: &PortalSession,
    ctx: &FetchContext,
) -> Result<String, FetchError> {
    let response = session
        .get(
            &ctx.portal.dashboard_url,
            browser_headers(session, &ctx.portal.login_url),
        )
        .await?;
    let final_url = response.url().to_string();

    let body = checked_body(session, ctx, "dashboard", response).await?;
    ctx.artifacts.dump("debug_dashboard.html", &body).await;

    debug!(final_url = %final_url, "Dashboard warmed up");
    Ok(final_url)
}

// ============================================================================
// Helpers
// ============================================================================

/// Reads the body, turning a non-2xx status into a step error with the
/// body saved as an artifact.
pub(crate) async fn checked_body(
    session: &PortalSession,
    ctx: &FetchContext,
    step: &str,
    response: Response,
) -> Result<Vec<u8>, FetchError> {
    let status = response.status();
    let body = session.body(response).await?;

    if status.is_success() {
        return Ok(body);
    }

    warn!(step, status = status.as_u16(), "Step failed");
    let artifact = ctx.artifacts.error_body(step, &body).await;
    Err(FetchError::HttpStatus {
        step: step.to_string(),
        status: status.as_u16(),
        artifact,
    })
}

/// `Origin` and `Referer` headers mimicking the portal's own pages.
fn browser_headers(session: &PortalSession, referer: &str) -> HeaderMap {
    let origin = session.base_url().origin().ascii_serialization();
    header_map(&[(ORIGIN, origin.as_str()), (REFERER, referer)])
}

pub(crate) fn header_map(pairs: &[(HeaderName, &str)]) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for (name, value) in pairs {
        match HeaderValue::from_str(value) {
            Ok(v) => {
                headers.insert(name.clone(), v);
            }
            Err(_) => warn!(header = %name, "Skipping invalid header value"),
        }
    }
    headers
}

// ============================================================================
// Tests
// ============================================================================
