//! The cookie ladder.
//!
//! Rungs run in priority order until one returns a device list. A failed
//! rung hands over to the next one unless its error ends the ladder
//! (missing credentials, bad URL, protocol drift). Every rung leaves an
//! [`FetchAttempt`] behind so callers can explain a `FAIL`.

use std::ops::ControlFlow;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

use crate::context::FetchContext;
use crate::error::FetchError;
use crate::strategy::{FetchKind, FetchResult, FetchStrategy, LadderState};

// ============================================================================
// Fetch Attempt
// ============================================================================

/// How a rung ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptStatus {
    /// The rung returned a device list.
    Succeeded,
    /// The rung ran and failed with this message.
    Failed(String),
    /// The rung had nothing to work with (no cookie, no jar).
    Skipped,
}

/// Record of one rung.
#[derive(Debug, Clone)]
pub struct FetchAttempt {
    /// Strategy that ran.
    pub strategy_id: String,
    /// Rung kind.
    pub kind: FetchKind,
    /// How it ended.
    pub status: AttemptStatus,
    /// Time spent on it.
    pub duration: Duration,
}

impl FetchAttempt {
    fn new(strategy: &dyn FetchStrategy, status: AttemptStatus, duration: Duration) -> Self {
        Self {
            strategy_id: strategy.id().to_string(),
            kind: strategy.kind(),
            status,
            duration,
        }
    }

    /// Failure message, if the rung ran and failed.
    pub fn error(&self) -> Option<&str> {
        match &self.status {
            AttemptStatus::Failed(message) => Some(message),
            AttemptStatus::Succeeded | AttemptStatus::Skipped => None,
        }
    }

    /// Returns true if the rung actually ran.
    pub fn ran(&self) -> bool {
        self.status != AttemptStatus::Skipped
    }
}

// ============================================================================
// Fetch Outcome
// ============================================================================

/// Everything a ladder run produced.
#[derive(Debug)]
pub struct FetchOutcome {
    /// Device list, or the error that ended the ladder.
    pub result: Result<FetchResult, FetchError>,
    /// One record per rung considered.
    pub attempts: Vec<FetchAttempt>,
    /// Wall time of the whole run.
    pub duration: Duration,
}

impl FetchOutcome {
    /// Returns true if a device list was obtained.
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    /// Number of rungs considered, skipped ones included.
    pub fn attempts_count(&self) -> usize {
        self.attempts.len()
    }

    /// The strategy that produced the device list.
    pub fn successful_strategy(&self) -> Option<&str> {
        self.result.as_ref().ok().map(|r| r.strategy_id.as_str())
    }

    /// Failure messages of the rungs that ran, in order.
    pub fn errors(&self) -> Vec<&str> {
        self.attempts.iter().filter_map(FetchAttempt::error).collect()
    }

    /// Terminal ladder state.
    pub fn final_state(&self) -> LadderState {
        if self.is_success() {
            LadderState::Done
        } else {
            LadderState::Fail
        }
    }

    /// States visited by rungs that ran, followed by the terminal state.
    pub fn trace(&self) -> Vec<LadderState> {
        self.attempts
            .iter()
            .filter(|a| a.ran())
            .map(|a| a.kind.ladder_state())
            .chain(std::iter::once(self.final_state()))
            .collect()
    }
}

// ============================================================================
// Fetch Pipeline
// ============================================================================

/// Ordered set of ladder rungs.
pub struct FetchPipeline {
    strategies: Vec<Box<dyn FetchStrategy>>,
}

impl FetchPipeline {
    /// Creates a ladder with no rungs.
    pub fn new() -> Self {
        Self {
            strategies: Vec::new(),
        }
    }

    /// Creates a ladder from `strategies`, highest priority first.
    pub fn with_strategies(mut strategies: Vec<Box<dyn FetchStrategy>>) -> Self {
        strategies.sort_by_key(|s| std::cmp::Reverse(s.priority()));
        Self { strategies }
    }

    /// Number of rungs.
    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    /// Returns true if there are no rungs.
    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// Strategy ids in execution order.
    pub fn strategy_ids(&self) -> Vec<&str> {
        self.strategies.iter().map(|s| s.id()).collect()
    }

    /// Walks the ladder until a rung succeeds or an error ends it.
    #[instrument(skip(self, ctx), fields(rungs = self.strategies.len()))]
    pub async fn execute(&self, ctx: &FetchContext) -> FetchOutcome {
        let start = Instant::now();
        let mut attempts = Vec::with_capacity(self.strategies.len());

        let mut result = Err(if self.strategies.is_empty() {
            FetchError::StrategyNotAvailable("no rungs configured".to_string())
        } else {
            FetchError::AllStrategiesFailed
        });

        for strategy in &self.strategies {
            if let ControlFlow::Break(end) = run_rung(strategy.as_ref(), ctx, &mut attempts).await {
                result = end;
                break;
            }
        }

        match &result {
            Ok(found) => info!(strategy = %found.strategy_id, devices = found.devices.len(), "Ladder done"),
            Err(error) => warn!(error = %error, "Ladder failed"),
        }

        FetchOutcome {
            result,
            attempts,
            duration: start.elapsed(),
        }
    }
}

impl Default for FetchPipeline {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs one rung. `Break` carries the ladder's final result.
async fn run_rung(
    strategy: &dyn FetchStrategy,
    ctx: &FetchContext,
    attempts: &mut Vec<FetchAttempt>,
) -> ControlFlow<Result<FetchResult, FetchError>> {
    let state = strategy.kind().ladder_state();

    if !strategy.is_available(ctx).await {
        debug!(strategy = %strategy.id(), ?state, "Rung skipped");
        attempts.push(FetchAttempt::new(strategy, AttemptStatus::Skipped, Duration::ZERO));
        return ControlFlow::Continue(());
    }

    debug!(strategy = %strategy.id(), ?state, "Rung started");
    let started = Instant::now();
    let result = strategy.fetch(ctx).await;
    let elapsed = started.elapsed();

    match result {
        Ok(found) => {
            attempts.push(FetchAttempt::new(strategy, AttemptStatus::Succeeded, elapsed));
            ControlFlow::Break(Ok(found))
        }
        Err(error) => {
            warn!(strategy = %strategy.id(), error = %error, elapsed = ?elapsed, "Rung failed");
            attempts.push(FetchAttempt::new(
                strategy,
                AttemptStatus::Failed(error.to_string()),
                elapsed,
            ));
            if strategy.should_fallback(&error) {
                ControlFlow::Continue(())
            } else {
                debug!(strategy = %strategy.id(), class = ?error.class(), "Error ends the ladder");
                ControlFlow::Break(Err(error))
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
