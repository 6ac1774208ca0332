//! Raw serde view of the JSON configuration file.
//!
//! These structs mirror the on-disk layout; defaultable monitor fields stay
//! `Option` here and are resolved against the `general` section when the
//! snapshot is built.

use serde::Deserialize;
use std::collections::HashMap;

use crate::snapshot::{ActionStep, DataGroup};

#[derive(Debug, Deserialize)]
pub(crate) struct FileConfig {
    pub general: GeneralSection,
    pub softswitch: SoftswitchSection,
    #[serde(default)]
    pub monitors: MonitorsSection,
    #[serde(default)]
    pub actions: ActionsSection,
    #[serde(default)]
    pub action_chains: HashMap<String, Vec<ActionStep>>,
    #[serde(default)]
    pub data_groups: HashMap<String, DataGroup>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GeneralSection {
    pub hostname: String,
    #[serde(default = "default_execute_interval_secs")]
    pub default_execute_interval_secs: u64,
    #[serde(default = "default_hit_threshold")]
    pub default_hit_threshold: u32,
    #[serde(default = "default_minimum_number_length")]
    pub default_minimum_number_length: u32,
}

fn default_execute_interval_secs() -> u64 {
    300
}

fn default_hit_threshold() -> u32 {
    5
}

fn default_minimum_number_length() -> u32 {
    5
}

#[derive(Debug, Deserialize)]
pub(crate) struct SoftswitchSection {
    pub brand: String,
    #[serde(default)]
    pub version: String,
    pub cdrs_source: CdrsSourceSection,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CdrsSourceSection {
    pub dbms: String,
    #[serde(default = "default_db_host")]
    pub host: String,
    #[serde(default = "default_db_port")]
    pub port: u16,
    pub user_name: String,
    #[serde(default)]
    pub user_password: String,
    pub database_name: String,
    #[serde(default = "default_cdr_table")]
    pub table_name: String,
}

fn default_db_host() -> String {
    "localhost".to_string()
}

fn default_db_port() -> u16 {
    3306
}

fn default_cdr_table() -> String {
    "cdr".to_string()
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct MonitorsSection {
    #[serde(rename = "*simultaneous_calls")]
    pub simultaneous_calls: Option<BaseMonitorSection>,
    #[serde(rename = "*dangerous_destinations")]
    pub dangerous_destinations: Option<DestinationMonitorSection>,
    #[serde(rename = "*unexpected_destinations")]
    pub unexpected_destinations: Option<DestinationMonitorSection>,
    #[serde(rename = "*small_duration_calls")]
    pub small_duration_calls: Option<SmallDurationMonitorSection>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BaseMonitorSection {
    #[serde(default)]
    pub enabled: bool,
    pub execute_interval_secs: Option<u64>,
    pub hit_threshold: Option<u32>,
    pub minimum_number_length: Option<u32>,
    #[serde(default)]
    pub action_chain_name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DestinationMonitorSection {
    #[serde(flatten)]
    pub base: BaseMonitorSection,
    pub consider_cdrs_from_last_secs: u64,
    pub prefix_list: Vec<String>,
    pub match_regex: String,
    pub ignore_regex: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SmallDurationMonitorSection {
    #[serde(flatten)]
    pub base: BaseMonitorSection,
    pub consider_cdrs_from_last_secs: u64,
    pub match_regex: String,
    pub ignore_regex: String,
    pub duration_threshold_secs: u64,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ActionsSection {
    #[serde(rename = "*email")]
    pub email: Option<EmailSection>,
    #[serde(rename = "*local_commands")]
    pub local_commands: Option<LocalCommandsSection>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct EmailSection {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub recurrent: bool,
    #[serde(default)]
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    #[serde(default)]
    pub from: String,
}

fn default_smtp_port() -> u16 {
    587
}

#[derive(Debug, Deserialize)]
pub(crate) struct LocalCommandsSection {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub recurrent: bool,
}
