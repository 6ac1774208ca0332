//! Alarms on calls to destinations configured as dangerous.

use crate::matcher::PrefixMatcher;
use crate::monitors::evaluate_hits;
use crate::{effective_lookback, Monitor, MonitorError};
use async_trait::async_trait;
use fraudwatch_common::types::AlertContext;
use fraudwatch_config::DestinationRuleConfig;
use fraudwatch_softswitch::Softswitch;
use std::sync::Arc;
use std::time::{Duration, Instant};

const TITLE: &str = "Dangerous Destinations";

pub struct DangerousDestinations {
    config: DestinationRuleConfig,
    softswitch: Arc<dyn Softswitch>,
    started_at: Instant,
}

impl DangerousDestinations {
    pub fn new(
        config: DestinationRuleConfig,
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
impl Monitor for DangerousDestinations {
    fn name(&self) -> &'static str {
        "dangerous_destinations"
    }

    fn execute_interval(&self) -> Duration {
        self.config.execute_interval()
    }

    fn action_chain_name(&self) -> &str {
        &self.config.action_chain_name
    }

    async fn check(&self) -> Result<Option<AlertContext>, MonitorError> {
        let matcher = PrefixMatcher::build(
            &self.config.prefix_list,
            &self.config.match_regex,
            &self.config.ignore_regex,
            self.config.minimum_number_length,
        )?;

        let lookback = effective_lookback(self.config.lookback(), self.started_at);
        tracing::debug!(
            monitor = self.name(),
            lookback_secs = lookback.as_secs(),
            "querying CDRs"
        );

        let predicate = move |destination: &str, _billsec: u32| -> anyhow::Result<Option<String>> {
            Ok(matcher.classify(destination).map(str::to_string))
        };
        let hits = self.softswitch.query_hits(&predicate, lookback).await?;

        Ok(evaluate_hits(TITLE, self.config.hit_threshold, hits))
    }
}
