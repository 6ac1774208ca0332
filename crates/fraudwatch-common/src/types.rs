use serde::Serialize;

/// Matches found for one destination category during a single monitor tick.
///
/// Aggregated hits are rebuilt from scratch on every tick; they are never
/// carried over between ticks.
#[derive(Debug, Clone, Serialize)]
pub struct AggregatedHit {
    /// Destination category (usually a dialing prefix, e.g. `"351"`).
    pub prefix: String,
    /// Number of call records that matched this category.
    pub hits: u32,
    /// Dialed numbers that produced the matches, in query order.
    pub destinations: Vec<String>,
}

impl AggregatedHit {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            hits: 0,
            destinations: Vec::new(),
        }
    }

    pub fn record(&mut self, destination: &str) {
        self.hits += 1;
        self.destinations.push(destination.to_string());
    }
}

/// What a monitor found when it raised an alarm.
///
/// Built by the alarming monitor and handed to the action-chain dispatcher,
/// which turns it into notification subjects and bodies. The dispatcher never
/// mutates it.
#[derive(Debug, Clone)]
pub struct AlertContext {
    /// Human-readable monitor title (e.g. `"Dangerous Destinations"`).
    pub monitor_title: &'static str,
    pub detail: AlertDetail,
}

#[derive(Debug, Clone)]
pub enum AlertDetail {
    /// Per-category hit counts from a CDR-based monitor.
    Hits(Vec<AggregatedHit>),
    /// Live channel count from the simultaneous-calls monitor.
    ActiveCalls { count: u32, threshold: u32 },
}

impl AlertContext {
    pub fn hits(monitor_title: &'static str, hits: Vec<AggregatedHit>) -> Self {
        Self {
            monitor_title,
            detail: AlertDetail::Hits(hits),
        }
    }

    pub fn active_calls(monitor_title: &'static str, count: u32, threshold: u32) -> Self {
        Self {
            monitor_title,
            detail: AlertDetail::ActiveCalls { count, threshold },
        }
    }
}
