//! Per-monitor alarm state with episode tracking.

/// Run mode of one monitor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RunMode {
    #[default]
    Normal,
    /// Declared for a future intermediate level; nothing enters it today.
    Warning,
    Alarm,
}

/// Alarm state owned exclusively by the monitor's task.
///
/// The state is reset to `Normal` at the start of every tick and re-raised
/// while the condition still holds, which makes the machine both edge- and
/// level-sensitive: recurrent actions see every qualifying tick, while the
/// value returned by [`begin_tick`](Self::begin_tick) tells the dispatcher
/// whether this tick is the onset of an episode or its continuation.
#[derive(Debug, Default)]
pub struct MonitorState {
    run_mode: RunMode,
}

impl MonitorState {
    /// Starts a new tick: returns whether the previous tick was alarmed and
    /// resets the mode to `Normal` so that leaving the alarm condition is
    /// detected without any extra bookkeeping.
    pub fn begin_tick(&mut self) -> bool {
        let was_alarmed = self.run_mode != RunMode::Normal;
        self.run_mode = RunMode::Normal;
        was_alarmed
    }

    pub fn raise(&mut self) {
        self.run_mode = RunMode::Alarm;
    }

    pub fn is_alarmed(&self) -> bool {
        self.run_mode != RunMode::Normal
    }

    pub fn run_mode(&self) -> RunMode {
        self.run_mode
    }
}
