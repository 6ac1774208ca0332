//! The four built-in detection rules.

pub mod dangerous_destinations;
pub mod simultaneous_calls;
pub mod small_duration_calls;
pub mod unexpected_destinations;

pub use dangerous_destinations::DangerousDestinations;
pub use simultaneous_calls::SimultaneousCalls;
pub use small_duration_calls::SmallDurationCalls;
pub use unexpected_destinations::UnexpectedDestinations;

use fraudwatch_common::types::{AggregatedHit, AlertContext};
use std::collections::HashMap;

/// Applies the strict hit threshold to one tick's aggregated hits.
///
/// Returns the alert context when at least one category strictly exceeds the
/// threshold; a count exactly equal to the threshold does not alarm. All
/// categories are included in the context so the notification shows the full
/// picture of the tick, not just the offender.
pub(crate) fn evaluate_hits(
    monitor_title: &'static str,
    hit_threshold: u32,
    hits: HashMap<String, AggregatedHit>,
) -> Option<AlertContext> {
    let offending = hits.values().filter(|hit| hit.hits > hit_threshold);
    let mut any = false;
    for hit in offending {
        any = true;
        tracing::info!(
            prefix = %hit.prefix,
            hits = hit.hits,
            hit_threshold,
            monitor = monitor_title,
            "hits above threshold"
        );
    }
    if !any {
        return None;
    }

    let mut all: Vec<AggregatedHit> = hits.into_values().collect();
    all.sort_by(|a, b| a.prefix.cmp(&b.prefix));
    Some(AlertContext::hits(monitor_title, all))
}
