//! The three rungs of the cookie ladder.

use async_trait::async_trait;
use sfrhome_core::{parse_cookie_header, Cookie, NormalizeOutcome};
use tracing::{debug, info, instrument, warn};

use crate::auth::login;
use crate::context::FetchContext;
use crate::error::FetchError;
use crate::host::session::PortalSession;
use crate::pipeline::FetchPipeline;
use crate::resource::{fetch_resource, normalize_payload};
use crate::strategy::{FetchKind, FetchResult, FetchStrategy};

/// Builds the pipeline: explicit cookie, stored cookie, SSO.
pub fn default_pipeline() -> FetchPipeline {
    FetchPipeline::with_strategies(vec![
        Box::new(ExplicitCookieStrategy::new()),
        Box::new(StoredCookieStrategy::new()),
        Box::new(SsoStrategy::new()),
    ])
}

/// Fetches the device list with `cookies` loaded into `session`.
async fn fetch_with_cookies(
    ctx: &FetchContext,
    session: &PortalSession,
    cookies: &[Cookie],
) -> Result<NormalizeOutcome, FetchError> {
    session.import_cookies(cookies);

    let resource = fetch_resource(session, ctx, &ctx.portal.root_referer()).await?;
    normalize_payload(&resource, true)
}

/// Saves the session jar; failures are logged only.
async fn persist_jar(ctx: &FetchContext, session: &PortalSession) {
    let cookies = session.export_cookies();
    if cookies.is_empty() {
        debug!("Session jar is empty, not persisting");
        return;
    }
    if let Err(e) = ctx.cookie_file.save(&cookies).await {
        warn!(error = %e, "Failed to persist session cookies");
    }
}

// ============================================================================
// Explicit Cookie
// ============================================================================

/// Uses a `Cookie` header value supplied by the caller.
#[derive(Debug, Default)]
pub struct ExplicitCookieStrategy;

impl ExplicitCookieStrategy {
    /// Creates the strategy.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl FetchStrategy for ExplicitCookieStrategy {
    fn id(&self) -> &str {
        "sfrhome.explicit_cookie"
    }

    fn kind(&self) -> FetchKind {
        FetchKind::ExplicitCookie
    }

    async fn is_available(&self, ctx: &FetchContext) -> bool {
        ctx.explicit_cookie().is_some()
    }

    #[instrument(skip(self, ctx))]
    async fn fetch(&self, ctx: &FetchContext) -> Result<FetchResult, FetchError> {
        let header = ctx
            .explicit_cookie()
            .ok_or_else(|| FetchError::StrategyNotAvailable("no cookie supplied".into()))?;

        let session = PortalSession::from_context(ctx)?;
        let cookies = parse_cookie_header(header, session.host());
        if cookies.is_empty() {
            return Err(FetchError::SessionRejected(
                "cookie string holds no name=value pair".into(),
            ));
        }

        ctx.progress("Trying supplied cookie");
        let outcome = fetch_with_cookies(ctx, &session, &cookies).await?;
        persist_jar(ctx, &session).await;

        info!(devices = outcome.devices.len(), "Fetched with supplied cookie");
        Ok(FetchResult::new(outcome, self.id(), self.kind()))
    }
}

// ============================================================================
// Stored Cookie
// ============================================================================

/// Reuses the cookie jar saved by a previous run.
#[derive(Debug, Default)]
pub struct StoredCookieStrategy;

impl StoredCookieStrategy {
    /// Creates the strategy.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl FetchStrategy for StoredCookieStrategy {
    fn id(&self) -> &str {
        "sfrhome.stored_cookie"
    }

    fn kind(&self) -> FetchKind {
        FetchKind::StoredCookie
    }

    async fn is_available(&self, ctx: &FetchContext) -> bool {
        ctx.cookie_file.load().await.is_some()
    }

    #[instrument(skip(self, ctx))]
    async fn fetch(&self, ctx: &FetchContext) -> Result<FetchResult, FetchError> {
        let cookies = ctx
            .cookie_file
            .load()
            .await
            .ok_or_else(|| FetchError::StrategyNotAvailable("no stored cookies".into()))?;

        ctx.progress("Trying saved session cookies");
        let session = PortalSession::from_context(ctx)?;
        match fetch_with_cookies(ctx, &session, &cookies).await {
            Ok(outcome) => {
                info!(devices = outcome.devices.len(), "Fetched with stored cookies");
                Ok(FetchResult::new(outcome, self.id(), self.kind()))
            }
            Err(e) => {
                warn!(error = %e, "Stored cookies rejected, discarding jar");
                if let Err(delete_err) = ctx.cookie_file.delete().await {
                    warn!(error = %delete_err, "Failed to delete stale cookie file");
                }
                Err(e)
            }
        }
    }
}

// ============================================================================
// SSO
// ============================================================================

/// Logs in with credentials, then fetches the device list.
#[derive(Debug, Default)]
pub struct SsoStrategy;

impl SsoStrategy {
    /// Creates the strategy.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl FetchStrategy for SsoStrategy {
    fn id(&self) -> &str {
        "sfrhome.sso"
    }

    fn kind(&self) -> FetchKind {
        FetchKind::Sso
    }

    async fn is_available(&self, _ctx: &FetchContext) -> bool {
        true
    }

    #[instrument(skip(self, ctx))]
    async fn fetch(&self, ctx: &FetchContext) -> Result<FetchResult, FetchError> {
        let credentials = ctx
            .credentials
            .credentials()
            .filter(|c| !c.username.is_empty() && !c.password.is_empty())
            .ok_or(FetchError::MissingCredentials)?;

        let session = PortalSession::from_context(ctx)?;
        let auth = login(&session, ctx, &credentials).await?;

        persist_jar(ctx, &session).await;
        ctx.artifacts.dump_cookies(&session.export_cookies()).await;

        ctx.progress("Step 4/4: fetching device list");
        let resource = fetch_resource(&session, ctx, &auth.referer).await?;
        let outcome = normalize_payload(&resource, false)?;

        if outcome.devices.is_empty() {
            warn!("Device list is empty");
        }
        info!(devices = outcome.devices.len(), "Fetched after SSO login");
        Ok(FetchResult::new(outcome, self.id(), self.kind()))
    }
}

// ============================================================================
// Tests
// ============================================================================
