//! Fetch strategy trait and types.
//!
//! A strategy represents one way of obtaining an authenticated session for
//! the device list: a cookie supplied by the caller, the cookie jar saved by
//! an earlier run, or a full SSO login. Strategies are tried in priority
//! order by the [`crate::pipeline::FetchPipeline`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sfrhome_core::{Device, DeviceSnapshot, FetchSource, NormalizeOutcome};
use std::fmt;

use crate::context::FetchContext;
use crate::error::{ErrorClass, FetchError};

// ============================================================================
// Fetch Kind
// ============================================================================

/// The kind of session a strategy uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchKind {
    /// Cookie string given on the command line or in the environment.
    ExplicitCookie,
    /// Cookie jar persisted by a previous run.
    StoredCookie,
    /// Fresh SSO login.
    Sso,
}

impl FetchKind {
    /// Returns the display name for this kind.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::ExplicitCookie => "Explicit Cookie",
            Self::StoredCookie => "Stored Cookie",
            Self::Sso => "SSO Login",
        }
    }

    /// Convert to `FetchSource` for recording in snapshots.
    pub fn to_fetch_source(&self) -> FetchSource {
        match self {
            Self::ExplicitCookie => FetchSource::ExplicitCookie,
            Self::StoredCookie => FetchSource::StoredCookie,
            Self::Sso => FetchSource::Sso,
        }
    }

    /// Ladder state in which this kind is tried.
    pub fn ladder_state(&self) -> LadderState {
        match self {
            Self::ExplicitCookie => LadderState::TryExplicitCookie,
            Self::StoredCookie => LadderState::TryStoredCookie,
            Self::Sso => LadderState::RunSso,
        }
    }
}

impl fmt::Display for FetchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

// ============================================================================
// Ladder State
// ============================================================================

/// Position in the cookie ladder.
///
/// Moves forward only: `TryExplicitCookie -> TryStoredCookie -> RunSso`,
/// ending in `Done` or `Fail`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LadderState {
    /// Trying the caller's cookie.
    TryExplicitCookie,
    /// Trying the saved cookie jar.
    TryStoredCookie,
    /// Logging in.
    RunSso,
    /// A device list was obtained.
    Done,
    /// Every applicable step failed.
    Fail,
}

impl LadderState {
    /// Returns true for `Done` and `Fail`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Fail)
    }
}

// ============================================================================
// Fetch Result
// ============================================================================

/// The result of a successful fetch operation.
#[derive(Debug, Clone)]
pub struct FetchResult {
    /// Normalized devices.
    pub devices: Vec<Device>,
    /// Malformed XML fragments skipped while parsing.
    pub recovered_errors: usize,
    /// The strategy that succeeded.
    pub strategy_id: String,
    /// The kind of fetch used.
    pub kind: FetchKind,
}

impl FetchResult {
    /// Creates a new fetch result.
    pub fn new(outcome: NormalizeOutcome, strategy_id: impl Into<String>, kind: FetchKind) -> Self {
        Self {
            devices: outcome.devices,
            recovered_errors: outcome.recovered_errors,
            strategy_id: strategy_id.into(),
            kind,
        }
    }

    /// Converts into a timestamped snapshot.
    pub fn into_snapshot(self) -> DeviceSnapshot {
        DeviceSnapshot::new(self.devices, self.kind.to_fetch_source())
    }
}

// ============================================================================
// Fetch Strategy Trait
// ============================================================================

/// A way of fetching the device list.
///
/// ## Implementing a Strategy
///
/// ```ignore
/// struct FixtureStrategy;
///
/// #[async_trait]
/// impl FetchStrategy for FixtureStrategy {
///     fn id(&self) -> &str {
///         "fixture"
///     }
///
///     fn kind(&self) -> FetchKind {
///         FetchKind::StoredCookie
///     }
///
///     async fn is_available(&self, _ctx: &FetchContext) -> bool {
///         true
///     }
///
///     async fn fetch(&self, _ctx: &FetchContext) -> Result<FetchResult, FetchError> {
///         let outcome = normalize_devices(include_bytes!("fixture.xml"));
///         Ok(FetchResult::new(outcome, self.id(), self.kind()))
///     }
/// }
/// ```
#[async_trait]
pub trait FetchStrategy: Send + Sync {
    /// Unique identifier for this strategy (e.g., `sfrhome.sso`).
    fn id(&self) -> &str;

    /// The kind of fetch this strategy uses.
    fn kind(&self) -> FetchKind;

    /// Human-readable name for this strategy.
    fn display_name(&self) -> String {
        format!("{} ({})", self.id(), self.kind().display_name())
    }

    /// Check if this strategy can run at all (no network access).
    async fn is_available(&self, ctx: &FetchContext) -> bool;

    /// Fetch the device list using this strategy.
    async fn fetch(&self, ctx: &FetchContext) -> Result<FetchResult, FetchError>;

    /// Whether to try the next strategy if this one fails with the given error.
    ///
    /// Configuration errors and protocol drift end the ladder; everything
    /// else falls through.
    fn should_fallback(&self, error: &FetchError) -> bool {
        error.class() == ErrorClass::Transient
    }

    /// Priority of this strategy (higher = try first).
    fn priority(&self) -> u32 {
        match self.kind() {
            FetchKind::ExplicitCookie => 100,
            FetchKind::StoredCookie => 80,
            FetchKind::Sso => 60,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
