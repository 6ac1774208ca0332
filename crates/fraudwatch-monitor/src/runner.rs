//! Per-monitor scheduling: one task, one interval timer, one state machine.

use crate::state::MonitorState;
use crate::Monitor;
use fraudwatch_action::DispatcherHandle;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};

/// Drives one monitor until shutdown is signalled.
///
/// Monitors never block one another here; the only cross-monitor
/// serialization point is inside the dispatcher.
pub async fn run(
    monitor: Box<dyn Monitor>,
    dispatcher: DispatcherHandle,
    mut shutdown: watch::Receiver<bool>,
) {
    tracing::info!(
        monitor = monitor.name(),
        interval_secs = monitor.execute_interval().as_secs(),
        "monitor started"
    );

    let mut state = MonitorState::default();
    let mut tick = interval(monitor.execute_interval());
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = tick.tick() => run_tick(monitor.as_ref(), &mut state, &dispatcher).await,
            _ = shutdown.changed() => {
                tracing::info!(monitor = monitor.name(), "monitor stopped");
                return;
            }
        }
    }
}

/// One scheduling tick: evaluate, transition the state machine, dispatch.
pub async fn run_tick(
    monitor: &dyn Monitor,
    state: &mut MonitorState,
    dispatcher: &DispatcherHandle,
) {
    let outcome = match monitor.check().await {
        Ok(outcome) => outcome,
        Err(e) => {
            // Transient failure: keep the previous alarm state; the next
            // tick is the retry.
            tracing::error!(
                monitor = monitor.name(),
                error = %e,
                "tick aborted, previous alarm state preserved"
            );
            return;
        }
    };

    let was_alarmed = state.begin_tick();

    match outcome {
        Some(context) => {
            state.raise();
            tracing::info!(
                monitor = monitor.name(),
                episode_onset = !was_alarmed,
                "alarm condition holds"
            );

            if let Err(e) = dispatcher
                .dispatch(monitor.action_chain_name(), was_alarmed, context)
                .await
            {
                tracing::error!(
                    monitor = monitor.name(),
                    chain = monitor.action_chain_name(),
                    error = %e,
                    "action chain dispatch failed"
                );
            }
        }
        None => {
            if was_alarmed {
                tracing::info!(monitor = monitor.name(), "alarm cleared");
            } else {
                tracing::debug!(monitor = monitor.name(), "nothing detected");
            }
        }
    }
}
