//! Cross-reference and integrity validation for a resolved snapshot.
//!
//! Everything checked here is re-checked defensively at dispatch time; the
//! point of failing early is a clear startup error instead of a logged
//! dispatch failure hours later.

use crate::snapshot::{ActionStep, ConfigSnapshot, DataGroup};
use crate::{ConfigError, ACTION_EMAIL, ACTION_LOCAL_COMMANDS};

/// Placeholder token substituted with each configured prefix when the
/// match/ignore templates are compiled.
pub const PREFIX_TOKEN: &str = "__prefix__";

pub fn validate(snapshot: &ConfigSnapshot) -> Result<(), ConfigError> {
    if snapshot.general.hostname.is_empty() {
        return Err(invalid("general.hostname must not be empty"));
    }
    if snapshot.softswitch.brand != "*asterisk" {
        return Err(invalid(format!(
            "unsupported softswitch brand '{}'",
            snapshot.softswitch.brand
        )));
    }
    if snapshot.softswitch.cdrs_source.dbms != "mysql" {
        return Err(invalid(format!(
            "unsupported CDR source dbms '{}'",
            snapshot.softswitch.cdrs_source.dbms
        )));
    }

    if let Some(m) = &snapshot.monitors.simultaneous_calls {
        if m.enabled {
            check_base(
                snapshot,
                "*simultaneous_calls",
                m.execute_interval_secs,
                m.hit_threshold,
                m.minimum_number_length,
                &m.action_chain_name,
            )?;
        }
    }
    if let Some(m) = &snapshot.monitors.dangerous_destinations {
        if m.enabled {
            check_base(
                snapshot,
                "*dangerous_destinations",
                m.execute_interval_secs,
                m.hit_threshold,
                m.minimum_number_length,
                &m.action_chain_name,
            )?;
            check_destination_rule(
                "*dangerous_destinations",
                &m.prefix_list,
                &m.match_regex,
                &m.ignore_regex,
            )?;
        }
    }
    if let Some(m) = &snapshot.monitors.unexpected_destinations {
        if m.enabled {
            check_base(
                snapshot,
                "*unexpected_destinations",
                m.execute_interval_secs,
                m.hit_threshold,
                m.minimum_number_length,
                &m.action_chain_name,
            )?;
            check_destination_rule(
                "*unexpected_destinations",
                &m.prefix_list,
                &m.match_regex,
                &m.ignore_regex,
            )?;
        }
    }
    if let Some(m) = &snapshot.monitors.small_duration_calls {
        if m.enabled {
            check_base(
                snapshot,
                "*small_duration_calls",
                m.execute_interval_secs,
                m.hit_threshold,
                m.minimum_number_length,
                &m.action_chain_name,
            )?;
            check_templates("*small_duration_calls", &m.match_regex, &m.ignore_regex)?;
            if m.duration_threshold_secs == 0 {
                return Err(invalid(
                    "*small_duration_calls: duration_threshold_secs must be positive",
                ));
            }
        }
    }

    for (chain_name, steps) in &snapshot.action_chains {
        for step in steps {
            check_step(snapshot, chain_name, step)?;
        }
    }

    if snapshot.actions.email.enabled {
        if snapshot.actions.email.smtp_host.is_empty() {
            return Err(invalid("*email action: smtp_host must be set when enabled"));
        }
        if snapshot.actions.email.from.is_empty() {
            return Err(invalid("*email action: from must be set when enabled"));
        }
    }

    Ok(())
}

fn check_base(
    snapshot: &ConfigSnapshot,
    monitor: &str,
    execute_interval_secs: u64,
    hit_threshold: u32,
    minimum_number_length: u32,
    action_chain_name: &str,
) -> Result<(), ConfigError> {
    if execute_interval_secs == 0 {
        return Err(invalid(format!(
            "{monitor}: execute_interval_secs must be positive"
        )));
    }
    if hit_threshold == 0 {
        return Err(invalid(format!("{monitor}: hit_threshold must be positive")));
    }
    if minimum_number_length == 0 {
        return Err(invalid(format!(
            "{monitor}: minimum_number_length must be positive"
        )));
    }
    if !snapshot.action_chains.contains_key(action_chain_name) {
        return Err(invalid(format!(
            "{monitor}: action chain '{action_chain_name}' is not configured"
        )));
    }
    Ok(())
}

fn check_destination_rule(
    monitor: &str,
    prefix_list: &[String],
    match_regex: &str,
    ignore_regex: &str,
) -> Result<(), ConfigError> {
    if prefix_list.is_empty() {
        return Err(invalid(format!("{monitor}: prefix_list must not be empty")));
    }
    check_templates(monitor, match_regex, ignore_regex)
}

/// Compiles both templates with a sample prefix substituted, so that regex
/// syntax errors fail at startup rather than aborting every tick.
fn check_templates(monitor: &str, match_regex: &str, ignore_regex: &str) -> Result<(), ConfigError> {
    for (name, template) in [("match_regex", match_regex), ("ignore_regex", ignore_regex)] {
        let pattern = template.replacen(PREFIX_TOKEN, "351", 1);
        if let Err(e) = regex::Regex::new(&pattern) {
            return Err(invalid(format!("{monitor}: {name} does not compile: {e}")));
        }
    }
    Ok(())
}

fn check_step(
    snapshot: &ConfigSnapshot,
    chain_name: &str,
    step: &ActionStep,
) -> Result<(), ConfigError> {
    let required: fn(&DataGroup) -> bool = match step.action.as_str() {
        ACTION_EMAIL => |g| g.email_address.is_some(),
        ACTION_LOCAL_COMMANDS => |g| g.command_name.is_some(),
        other => {
            return Err(invalid(format!(
                "action chain '{chain_name}': unsupported action '{other}'"
            )))
        }
    };

    for group_name in &step.data_groups {
        let Some(group) = snapshot.data_groups.get(group_name) else {
            return Err(invalid(format!(
                "action chain '{chain_name}': data group '{group_name}' is not configured"
            )));
        };
        if !required(group) {
            return Err(invalid(format!(
                "action chain '{chain_name}': data group '{group_name}' is missing the field required by {}",
                step.action
            )));
        }
    }
    Ok(())
}

fn invalid(msg: impl Into<String>) -> ConfigError {
    ConfigError::Invalid(msg.into())
}
