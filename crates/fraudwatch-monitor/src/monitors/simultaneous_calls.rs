//! Alarms when too many calls are active at once.

use crate::{Monitor, MonitorError};
use async_trait::async_trait;
use fraudwatch_common::types::AlertContext;
use fraudwatch_config::SimultaneousCallsConfig;
use fraudwatch_softswitch::Softswitch;
use std::sync::Arc;
use std::time::Duration;

const TITLE: &str = "Simultaneous Calls";

pub struct SimultaneousCalls {
    config: SimultaneousCallsConfig,
    softswitch: Arc<dyn Softswitch>,
}

impl SimultaneousCalls {
    pub fn new(config: SimultaneousCallsConfig, softswitch: Arc<dyn Softswitch>) -> Self {
        Self { config, softswitch }
    }
}

#[async_trait]
impl Monitor for SimultaneousCalls {
    fn name(&self) -> &'static str {
        "simultaneous_calls"
    }

    fn execute_interval(&self) -> Duration {
        self.config.execute_interval()
    }

    fn action_chain_name(&self) -> &str {
        &self.config.action_chain_name
    }

    async fn check(&self) -> Result<Option<AlertContext>, MonitorError> {
        let count = self
            .softswitch
            .active_call_count(self.config.minimum_number_length)
            .await?;

        if count > self.config.hit_threshold {
            tracing::info!(
                count,
                hit_threshold = self.config.hit_threshold,
                "active calls above threshold"
            );
            Ok(Some(AlertContext::active_calls(
                TITLE,
                count,
                self.config.hit_threshold,
            )))
        } else {
            tracing::debug!(count, hit_threshold = self.config.hit_threshold, "active calls checked");
            Ok(None)
        }
    }
}
