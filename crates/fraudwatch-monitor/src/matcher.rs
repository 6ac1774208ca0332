//! Destination and duration pattern matching.
//!
//! Matchers are rebuilt at the start of every tick from the rule's
//! configured templates, so a template that stops compiling surfaces as a
//! per-tick error (logged, tick aborted, no state change) instead of a
//! panic. Validation compiles the same templates at startup, which makes a
//! failure here defensive only.

use crate::intl;
use fraudwatch_config::validate::PREFIX_TOKEN;
use regex::Regex;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, thiserror::Error)]
pub enum MatchError {
    #[error("match template does not compile for prefix '{prefix}': {source}")]
    BadMatchTemplate { prefix: String, source: regex::Error },

    #[error("ignore template does not compile for prefix '{prefix}': {source}")]
    BadIgnoreTemplate { prefix: String, source: regex::Error },
}

fn compile_pair(
    match_template: &str,
    ignore_template: &str,
    prefix: &str,
) -> Result<(Regex, Regex), MatchError> {
    let matches = Regex::new(&match_template.replacen(PREFIX_TOKEN, prefix, 1)).map_err(|source| {
        MatchError::BadMatchTemplate {
            prefix: prefix.to_string(),
            source,
        }
    })?;
    let ignores = Regex::new(&ignore_template.replacen(PREFIX_TOKEN, prefix, 1)).map_err(|source| {
        MatchError::BadIgnoreTemplate {
            prefix: prefix.to_string(),
            source,
        }
    })?;
    Ok((matches, ignores))
}

/// Matches destinations against an ordered prefix list.
///
/// List order encodes priority: the first prefix whose match-regex matches
/// and whose ignore-regex does not wins, and later prefixes are not
/// consulted for that candidate.
#[derive(Debug)]
pub struct PrefixMatcher {
    minimum_number_length: usize,
    entries: Vec<PrefixEntry>,
}

#[derive(Debug)]
struct PrefixEntry {
    prefix: String,
    matches: Regex,
    ignores: Regex,
}

impl PrefixMatcher {
    pub fn build(
        prefix_list: &[String],
        match_template: &str,
        ignore_template: &str,
        minimum_number_length: u32,
    ) -> Result<Self, MatchError> {
        let mut entries = Vec::with_capacity(prefix_list.len());
        for prefix in prefix_list {
            let (matches, ignores) = compile_pair(match_template, ignore_template, prefix)?;
            entries.push(PrefixEntry {
                prefix: prefix.clone(),
                matches,
                ignores,
            });
        }
        Ok(Self {
            minimum_number_length: minimum_number_length as usize,
            entries,
        })
    }

    pub fn meets_minimum_length(&self, candidate: &str) -> bool {
        candidate.len() >= self.minimum_number_length
    }

    /// Returns the winning prefix for `candidate`, or `None` when the
    /// candidate is too short or matches no configured prefix.
    pub fn classify(&self, candidate: &str) -> Option<&str> {
        if !self.meets_minimum_length(candidate) {
            return None;
        }
        self.entries
            .iter()
            .find(|entry| entry.matches.is_match(candidate) && !entry.ignores.is_match(candidate))
            .map(|entry| entry.prefix.as_str())
    }
}

/// Matches abnormally short calls.
///
/// The category is not configured: it is the destination's international
/// calling code, looked up in the assigned-code table. Match/ignore
/// templates are compiled lazily per encountered code and cached for the
/// rest of the tick.
pub struct DurationMatcher {
    minimum_number_length: usize,
    duration_threshold_secs: u64,
    match_template: String,
    ignore_template: String,
    compiled: Mutex<HashMap<&'static str, (Regex, Regex)>>,
}

impl DurationMatcher {
    pub fn new(
        match_template: impl Into<String>,
        ignore_template: impl Into<String>,
        minimum_number_length: u32,
        duration_threshold_secs: u64,
    ) -> Self {
        Self {
            minimum_number_length: minimum_number_length as usize,
            duration_threshold_secs,
            match_template: match_template.into(),
            ignore_template: ignore_template.into(),
            compiled: Mutex::new(HashMap::new()),
        }
    }

    /// Classifies one call record; a hit requires a known calling code, a
    /// template match and a billed duration strictly below the threshold.
    pub fn classify(
        &self,
        candidate: &str,
        duration_secs: u32,
    ) -> Result<Option<&'static str>, MatchError> {
        if candidate.len() < self.minimum_number_length {
            return Ok(None);
        }
        let Some(code) = intl::find_calling_code(candidate) else {
            return Ok(None);
        };
        if u64::from(duration_secs) >= self.duration_threshold_secs {
            return Ok(None);
        }

        let mut compiled = self.compiled.lock().unwrap();
        if !compiled.contains_key(code) {
            let pair = compile_pair(&self.match_template, &self.ignore_template, code)?;
            compiled.insert(code, pair);
        }
        let (matches, ignores) = &compiled[code];

        Ok((matches.is_match(candidate) && !ignores.is_match(candidate)).then_some(code))
    }
}
