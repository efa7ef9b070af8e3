// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # SFR Home Fetch
//!
//! Session handling and device list retrieval for the SFR Home portal.
//!
//! ## Host APIs
//!
//! The [`host`] module wraps the outside world:
//!
//! - [`host::session`] - HTTP client with its cookie jar
//! - [`host::artifacts`] - Debug and error body dumps
//!
//! ## Login and Fetch
//!
//! - [`auth`] - SSO token exchange, login form replay, dashboard warm-up
//! - [`resource`] - Device list request and payload checks
//!
//! ## Cookie Ladder
//!
//! - [`strategy::FetchStrategy`] - Trait for one rung of the ladder
//! - [`strategies`] - Explicit cookie, stored cookie and SSO rungs
//! - [`pipeline::FetchPipeline`] - Executes strategies in order
//! - [`context::FetchContext`] - Endpoints, settings and credentials
//!
//! ## Example
//!
//! ```ignore
//! use sfrhome_fetch::{default_pipeline, FetchContext};
//!
//! let ctx = FetchContext::new();
//! let outcome = default_pipeline().execute(&ctx).await;
//! let snapshot = outcome.result?.into_snapshot();
//! ```

pub mod auth;
pub mod context;
pub mod error;
pub mod host;
pub mod pipeline;
pub mod resource;
pub mod strategies;
pub mod strategy;

// Errors
pub use error::{ErrorClass, FetchError};

// Host APIs
pub use host::{ArtifactWriter, PortalSession};

// Login and fetch
pub use auth::{extract_login_form, login, AuthenticatedSession, FormMethod, LoginForm};
pub use resource::{fetch_resource, normalize_payload, FetchedResource};

// Strategy & Pipeline
pub use context::{
    CredentialProvider, Credentials, FetchContext, FetchContextBuilder, FetchSettings,
    PortalSettings, ProgressFn, StaticCredentials, DEFAULT_USER_AGENT,
};
pub use pipeline::{AttemptStatus, FetchAttempt, FetchOutcome, FetchPipeline};
pub use strategies::{default_pipeline, ExplicitCookieStrategy, SsoStrategy, StoredCookieStrategy};
pub use strategy::{FetchKind, FetchResult, FetchStrategy, LadderState};
