//! Asterisk implementation of the [`Softswitch`] trait.

use crate::{HitPredicate, Softswitch, SoftswitchError};
use async_trait::async_trait;
use chrono::Utc;
use fraudwatch_common::types::AggregatedHit;
use regex::Regex;
use sqlx::mysql::MySqlPool;
use sqlx::Row;
use std::collections::HashMap;
use std::sync::LazyLock;
use std::time::Duration;
use tokio::process::Command;

/// Dial string format Asterisk writes into `lastdata` for SIP/DAHDI calls;
/// the capture group is the dialed number.
const ASTERISK_DIAL_STRING: &str = r"(?:SIP|DAHDI)/[^@&]+/([0-9]+)";

/// Field count of one `core show channels concise` output line.
const CONCISE_LINE_FIELDS: usize = 14;

static DIAL_STRING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(ASTERISK_DIAL_STRING).unwrap());

pub struct AsteriskSoftswitch {
    /// `None` when no CDR-based monitor is enabled; calling `query_hits`
    /// without a pool is a configuration-integrity error.
    cdr_pool: Option<MySqlPool>,
    cdr_table: String,
}

impl AsteriskSoftswitch {
    pub fn new(cdr_pool: Option<MySqlPool>, cdr_table: impl Into<String>) -> Self {
        Self {
            cdr_pool,
            cdr_table: cdr_table.into(),
        }
    }
}

#[async_trait]
impl Softswitch for AsteriskSoftswitch {
    async fn query_hits(
        &self,
        predicate: HitPredicate<'_>,
        lookback: Duration,
    ) -> Result<HashMap<String, AggregatedHit>, SoftswitchError> {
        let pool = self.cdr_pool.as_ref().ok_or(SoftswitchError::NoCdrSource)?;

        let cutoff = Utc::now() - chrono::Duration::from_std(lookback).unwrap_or_default();

        // Table name comes from the validated config, not user input.
        let sql = format!(
            "SELECT calldate, lastapp, lastdata, billsec FROM {} \
             WHERE calldate >= ? ORDER BY calldate DESC",
            self.cdr_table
        );
        let rows = sqlx::query(&sql)
            .bind(cutoff.naive_utc())
            .fetch_all(pool)
            .await?;

        let mut result: HashMap<String, AggregatedHit> = HashMap::new();
        let mut total = 0u32;
        let mut suitable = 0u32;
        let mut matched = 0u32;

        for row in rows {
            total += 1;

            let lastapp: String = row.try_get("lastapp")?;
            let lastdata: String = row.try_get("lastdata")?;
            let billsec: u32 = row.try_get::<i64, _>("billsec")?.max(0) as u32;

            // Only Dial records with a recognizable dial string are relevant.
            let Some(dialed) = extract_dialed_number(&lastapp, &lastdata) else {
                continue;
            };
            suitable += 1;

            match predicate(dialed, billsec) {
                Ok(Some(category)) => {
                    matched += 1;
                    result
                        .entry(category.clone())
                        .or_insert_with(|| AggregatedHit::new(category))
                        .record(dialed);
                }
                Ok(None) => {}
                Err(e) => return Err(SoftswitchError::Predicate(e)),
            }
        }

        tracing::info!(total, suitable, matched, "CDR scan finished");

        Ok(result)
    }

    async fn active_call_count(
        &self,
        minimum_number_length: u32,
    ) -> Result<u32, SoftswitchError> {
        let output = Command::new("asterisk")
            .args(["-rx", "core show channels concise"])
            .output()
            .await?;

        if !output.status.success() {
            return Err(SoftswitchError::CommandStatus(output.status));
        }

        let text = String::from_utf8_lossy(&output.stdout);
        Ok(count_active_calls(&text, minimum_number_length))
    }
}

/// Extracts the dialed number from a CDR's application fields, or `None`
/// when the record is not a Dial with a recognizable dial string.
fn extract_dialed_number<'a>(lastapp: &str, lastdata: &'a str) -> Option<&'a str> {
    if lastapp != "Dial" {
        return None;
    }
    DIAL_STRING_RE
        .captures(lastdata)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Counts suitable calls in `core show channels concise` output.
///
/// Concise lines are '!'-separated with 14 fields; field 5 is the
/// application and field 6 its data.
fn count_active_calls(output: &str, minimum_number_length: u32) -> u32 {
    let mut calls = 0u32;
    let mut lines = 0u32;

    for line in output.lines() {
        lines += 1;
        let items: Vec<&str> = line.split('!').collect();
        if items.len() != CONCISE_LINE_FIELDS {
            tracing::debug!(fields = items.len(), "channel line has unexpected field count");
            continue;
        }

        let Some(dialed) = extract_dialed_number(items[5], items[6]) else {
            continue;
        };

        if dialed.len() as u32 > minimum_number_length {
            calls += 1;
        } else {
            tracing::debug!(number = dialed, "active call ignored due to number length");
        }
    }

    tracing::debug!(lines, calls, "channel listing scanned");
    calls
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dial_string_extraction() {
        assert_eq!(
            extract_dialed_number("Dial", "SIP/trunk-out/351123456789,30"),
            Some("351123456789")
        );
        assert_eq!(
            extract_dialed_number("Dial", "DAHDI/g0/244987654321"),
            Some("244987654321")
        );
        // Not a Dial application
        assert_eq!(extract_dialed_number("Playback", "SIP/trunk/351123456789"), None);
        // No dial string present
        assert_eq!(extract_dialed_number("Dial", "Local/100@from-internal"), None);
    }

    fn concise_line(app: &str, data: &str) -> String {
        // channel!context!exten!prio!state!app!data!caller!account!amaflags!duration!bridged!server!peer
        format!("SIP/100-0001!from-internal!!1!Up!{app}!{data}!100!!3!45!!!")
    }

    #[test]
    fn active_call_counting_respects_minimum_length() {
        let output = [
            concise_line("Dial", "SIP/trunk/351123456789,30"),
            concise_line("Dial", "SIP/trunk/123,30"), // too short
            concise_line("MusicOnHold", "default"),
            "short!line".to_string(),
        ]
        .join("\n");

        assert_eq!(count_active_calls(&output, 5), 1);
    }

    #[test]
    fn boundary_length_is_excluded() {
        // Strictly longer than the minimum counts, equal does not.
        let output = concise_line("Dial", "SIP/trunk/12345,30");
        assert_eq!(count_active_calls(&output, 5), 0);
        assert_eq!(count_active_calls(&output, 4), 1);
    }
}
