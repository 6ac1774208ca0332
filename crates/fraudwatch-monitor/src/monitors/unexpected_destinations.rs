//! Alarms on calls that match none of the expected destinations.
//!
//! The prefix list here is a whitelist: a sufficiently long dialed number
//! that matches no expected prefix counts as a hit, categorized by its
//! international calling code (`"other"` when the code is unassigned).

use crate::matcher::PrefixMatcher;
use crate::monitors::evaluate_hits;
use crate::{effective_lookback, intl, Monitor, MonitorError};
use async_trait::async_trait;
use fraudwatch_common::types::AlertContext;
use fraudwatch_config::DestinationRuleConfig;
use fraudwatch_softswitch::Softswitch;
use std::sync::Arc;
use std::time::{Duration, Instant};

const TITLE: &str = "Unexpected Destinations";

pub struct UnexpectedDestinations {
    config: DestinationRuleConfig,
    softswitch: Arc<dyn Softswitch>,
    started_at: Instant,
}

impl UnexpectedDestinations {
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
impl Monitor for UnexpectedDestinations {
    fn name(&self) -> &'static str {
        "unexpected_destinations"
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

        let predicate = move |destination: &str, _billsec: u32| -> anyhow::Result<Option<String>> {
            if !matcher.meets_minimum_length(destination) {
                return Ok(None);
            }
            if matcher.classify(destination).is_some() {
                // Expected destination; not a hit.
                return Ok(None);
            }
            Ok(Some(
                intl::find_calling_code(destination)
                    .unwrap_or("other")
                    .to_string(),
            ))
        };
        let hits = self.softswitch.query_hits(&predicate, lookback).await?;

        Ok(evaluate_hits(TITLE, self.config.hit_threshold, hits))
    }
}
