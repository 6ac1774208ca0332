//! The monitor execution engine.
//!
//! One [`Monitor`] instance exists per enabled detection rule. Each runs on
//! its own task with an independent interval timer (see [`runner`]); on
//! every tick it queries the softswitch, aggregates hits, compares them
//! against its threshold and reports whether the alarm condition holds. The
//! per-tick alarm state machine lives in [`state`], the destination
//! pattern-matching in [`matcher`].

pub mod intl;
pub mod matcher;
pub mod monitors;
pub mod runner;
pub mod state;


use async_trait::async_trait;
use fraudwatch_common::types::AlertContext;
use std::time::{Duration, Instant};

use matcher::MatchError;

/// One detection rule.
///
/// Implementations own their configuration and softswitch handle; the alarm
/// state is owned by the runner so that `check` stays a pure
/// "does the condition hold right now" question.
#[async_trait]
pub trait Monitor: Send + Sync {
    /// Stable identifier used in log events (e.g. `"dangerous_destinations"`).
    fn name(&self) -> &'static str;

    fn execute_interval(&self) -> Duration;

    /// Name of the action chain to run when this monitor alarms.
    fn action_chain_name(&self) -> &str;

    /// Evaluates the rule once.
    ///
    /// Returns `Ok(Some(context))` when the alarm condition holds,
    /// `Ok(None)` when it does not, and `Err` when the tick could not be
    /// completed (the runner then preserves the previous alarm state).
    async fn check(&self) -> Result<Option<AlertContext>, MonitorError>;
}

#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error(transparent)]
    Match(#[from] MatchError),

    #[error(transparent)]
    Softswitch(#[from] fraudwatch_softswitch::SoftswitchError),
}

/// Bounds a CDR lookback window by the time since process start.
///
/// After a restart the alarm state is gone; without this bound the first
/// ticks would re-alert on records that already alerted before the restart.
pub fn effective_lookback(configured: Duration, started_at: Instant) -> Duration {
    configured.min(started_at.elapsed())
}
