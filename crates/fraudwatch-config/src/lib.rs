//! Configuration snapshot for the fraudwatch agent.
//!
//! The agent reads a single JSON file at startup, resolves general defaults
//! into each monitor section, validates cross-references (action chains,
//! data groups, regex templates) and hands the resulting immutable
//! [`ConfigSnapshot`] to the rest of the system by `Arc`. Nothing re-reads
//! the file after startup; there is no hot reload.

mod file;
pub mod snapshot;
pub mod validate;

pub use snapshot::{
    ActionSettings, ActionStep, CdrsSourceConfig, ConfigSnapshot, DataGroup,
    DestinationRuleConfig, EmailSetting, GeneralConfig, LocalCommandSetting, Monitors,
    SimultaneousCallsConfig, SmallDurationCallsConfig, SoftswitchConfig, ACTION_EMAIL,
    ACTION_LOCAL_COMMANDS, DEFAULT_ACTION_CHAIN,
};

use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read configuration file {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("configuration file is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
