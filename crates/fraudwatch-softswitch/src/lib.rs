//! Telephony data access for the fraudwatch monitors.
//!
//! The core never talks to a database or a switch CLI directly; it sees call
//! activity only through the [`Softswitch`] trait. The one concrete
//! implementation in the baseline is [`asterisk::AsteriskSoftswitch`], which
//! reads CDRs from a MySQL table and live channel state from the Asterisk
//! console.

pub mod asterisk;

use async_trait::async_trait;
use fraudwatch_common::types::AggregatedHit;
use std::collections::HashMap;
use std::time::Duration;

/// Classifies one dialed number into a hit category.
///
/// Returns `Ok(Some(category))` when the number counts as a hit,
/// `Ok(None)` when it does not, and `Err` when classification itself failed
/// (which aborts the whole query, and with it the tick).
pub type HitPredicate<'a> =
    &'a (dyn Fn(&str, u32) -> Result<Option<String>, anyhow::Error> + Send + Sync);

/// A monitored switching platform.
///
/// Implementations block only the calling monitor's task; they hold no
/// shared mutable state.
#[async_trait]
pub trait Softswitch: Send + Sync {
    /// Runs `predicate` over every suitable call record from the last
    /// `lookback` and aggregates the hits per category.
    ///
    /// The predicate receives the dialed number and the billed call duration
    /// in seconds.
    async fn query_hits(
        &self,
        predicate: HitPredicate<'_>,
        lookback: Duration,
    ) -> Result<HashMap<String, AggregatedHit>, SoftswitchError>;

    /// Counts currently active calls whose dialed number is longer than
    /// `minimum_number_length`.
    async fn active_call_count(&self, minimum_number_length: u32)
        -> Result<u32, SoftswitchError>;
}

#[derive(Debug, thiserror::Error)]
pub enum SoftswitchError {
    #[error("CDR database query failed: {0}")]
    Database(#[from] sqlx::Error),

    #[error("no CDR source is configured for this softswitch")]
    NoCdrSource,

    #[error("hit predicate failed: {0}")]
    Predicate(#[source] anyhow::Error),

    #[error("could not run the channel listing command: {0}")]
    Command(#[from] std::io::Error),

    #[error("channel listing command exited with {0}")]
    CommandStatus(std::process::ExitStatus),
}
