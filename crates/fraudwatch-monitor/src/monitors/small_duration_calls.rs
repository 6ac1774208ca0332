//! Alarms on abnormally short international calls.

use crate::matcher::DurationMatcher;
use crate::monitors::evaluate_hits;
use crate::{effective_lookback, Monitor, MonitorError};
use async_trait::async_trait;
use fraudwatch_common::types::AlertContext;
use fraudwatch_config::SmallDurationCallsConfig;
use fraudwatch_softswitch::Softswitch;
use std::sync::Arc;
use std::time::{Duration, Instant};

const TITLE: &str = "Small Duration Calls";

pub struct SmallDurationCalls {
    config: SmallDurationCallsConfig,
    softswitch: Arc<dyn Softswitch>,
    started_at: Instant,
}

impl SmallDurationCalls {
    pub fn new(
        config: SmallDurationCallsConfig,
        softswitch: Arc<dyn Softswitch>,
        started_at: Instant,
    ) -> Self {
        Self {
            config,
            softswitch,
            started_at,
        }
    }
}

#[async_trait]
impl Monitor for SmallDurationCalls {
    fn name(&self) -> &'static str {
        "small_duration_calls"
    }

    fn execute_interval(&self) -> Duration {
        self.config.execute_interval()
    }

    fn action_chain_name(&self) -> &str {
        &self.config.action_chain_name
    }

    async fn check(&self) -> Result<Option<AlertContext>, MonitorError> {
        let matcher = DurationMatcher::new(
            self.config.match_regex.clone(),
            self.config.ignore_regex.clone(),
            self.config.minimum_number_length,
            self.config.duration_threshold_secs,
        );

        let lookback = effective_lookback(self.config.lookback(), self.started_at);

        let predicate = move |destination: &str, billsec: u32| -> anyhow::Result<Option<String>> {
            Ok(matcher
                .classify(destination, billsec)?
                .map(str::to_string))
        };
        let hits = self.softswitch.query_hits(&predicate, lookback).await?;

        Ok(evaluate_hits(TITLE, self.config.hit_threshold, hits))
    }
}
