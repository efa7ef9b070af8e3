//! Device list request.

use reqwest::header::{HeaderName, ACCEPT, CONTENT_TYPE, REFERER};
use sfrhome_core::{normalize_devices, NormalizeOutcome};
use tracing::{debug, instrument, warn};

use crate::auth::{checked_body, header_map};
use crate::context::FetchContext;
use crate::error::FetchError;
use crate::host::session::PortalSession;

const XML_ACCEPT: &str = "application/xml,text/xml,*/*";
const X_REQUESTED_WITH: &str = "x-requested-with";

/// Raw device list response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedResource {
    /// Response body.
    pub bytes: Vec<u8>,
    /// `Content-Type` header, lower-cased.
    pub content_type: Option<String>,
}

impl FetchedResource {
    /// Returns true if the portal answered with an HTML page.
    pub fn is_html(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.contains("text/html"))
    }
}

/// Requests the device list with the session's cookies.
#[instrument(skip(session, ctx))]
pub async fn fetch_resource(
    session: &PortalSession,
    ctx: &FetchContext,
    referer: &str,
) -> Result<FetchedResource, FetchError> {
    let headers = header_map(&[
        (ACCEPT, XML_ACCEPT),
        (HeaderName::from_static(X_REQUESTED_WITH), "XMLHttpRequest"),
        (REFERER, referer),
    ]);

    let response = session.get(&ctx.portal.resource_url, headers).await?;
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_ascii_lowercase);

    let bytes = checked_body(session, ctx, "mysensors", response).await?;
    ctx.artifacts.dump("debug_mysensors.xml", &bytes).await;

    debug!(bytes = bytes.len(), content_type = ?content_type, "Device list received");
    Ok(FetchedResource {
        bytes,
        content_type,
    })
}

/// Normalizes a fetched payload.
///
/// With `strict` set, a payload that cannot be the device list is a
/// [`FetchError::SessionRejected`], so a stale cookie falls through to the
/// next strategy. The login page is not always labelled `text/html`, so an
/// `<html>` document element or a document with no devices at all is
/// rejected too. Without `strict` these yield an empty device list.
pub fn normalize_payload(resource: &FetchedResource, strict: bool) -> Result<NormalizeOutcome, FetchError> {
    if strict && resource.is_html() {
        return Err(FetchError::SessionRejected(
            "portal returned an HTML page instead of the device list".into(),
        ));
    }

    let outcome = normalize_devices(&resource.bytes);
    if let Some(failure) = &outcome.failure {
        if strict {
            return Err(FetchError::SessionRejected(format!(
                "device list is not decodable: {failure}"
            )));
        }
        warn!(error = %failure, "Device list is not decodable, continuing with no devices");
        return Ok(outcome);
    }

    if strict {
        if outcome.root.as_deref().is_some_and(|r| r.eq_ignore_ascii_case("html")) {
            return Err(FetchError::SessionRejected(
                "portal returned an HTML document instead of the device list".into(),
            ));
        }
        if outcome.devices.is_empty() {
            return Err(FetchError::SessionRejected(
                "payload holds neither panel nor sensors".into(),
            ));
        }
    }
    Ok(outcome)
}
