//! Raw configuration schema (as parsed from TOML)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw configuration as parsed from TOML
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawConfig {
    /// Config schema version
    pub config_version: u32,

    /// Global daemon settings
    #[serde(default)]
    pub daemon: RawDaemonConfig,

    /// Telemetry sink settings
    #[serde(default)]
    pub telemetry: RawTelemetryConfig,

    /// Matching rules
    #[serde(default)]
    pub matcher: RawMatcher,
}

/// Daemon-level settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawDaemonConfig {
    /// Seconds between cycles (default: 60)
    pub cycle_seconds: Option<u64>,

    /// Data directory for the counter database
    pub data_dir: Option<PathBuf>,

    /// Counter database filename inside the data directory
    pub counts_file: Option<PathBuf>,
}

/// Telemetry settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawTelemetryConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Base URL of the InfluxDB HTTP API (default: http://localhost:8086)
    pub url: Option<String>,

    /// Database name (default: gsc)
    pub database: Option<String>,

    /// Request timeout in seconds (default: 10)
    pub timeout_seconds: Option<u64>,
}

/// Named group of matching rules
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawMatcher {
    #[serde(default = "default_matcher_name")]
    pub name: String,

    /// Limits applied to rules that don't declare their own
    pub default_limits: Option<Vec<RawLimit>>,

    #[serde(default)]
    pub rules: Vec<RawRule>,
}

impl Default for RawMatcher {
    fn default() -> Self {
        Self {
            name: default_matcher_name(),
            default_limits: None,
            rules: Vec::new(),
        }
    }
}

/// Matching rule
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawRule {
    /// Unique rule ID; also the name quotas are tracked under
    pub id: String,

    /// Regular expressions, any of which selects a process
    #[serde(default)]
    pub include: Vec<String>,

    /// Regular expressions, any of which rejects a selected process
    #[serde(default)]
    pub exclude: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub limits: Option<Vec<RawLimit>>,
}

/// Quota for one unit
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawLimit {
    /// "day" or "week"
    pub unit: String,

    pub seconds: u64,
}

fn default_matcher_name() -> String {
    "default".to_string()
}
