//! Validated policy structures

use crate::schema::{RawConfig, RawDaemonConfig, RawLimit, RawMatcher, RawRule, RawTelemetryConfig};
use crate::validation::parse_unit;
use gsc_util::{default_data_dir, COUNTS_FILENAME, UnitKind};
use regex::Regex;
use std::path::PathBuf;
use std::time::Duration;

/// Default cycle length
pub const DEFAULT_CYCLE: Duration = Duration::from_secs(60);

/// Longest accepted cycle length
pub const MAX_CYCLE: Duration = Duration::from_secs(7 * 24 * 3600);

/// Default quota when neither the rule nor the matcher declares one
pub const DEFAULT_LIMIT: Limit = Limit {
    unit: UnitKind::Day,
    limit: Duration::from_secs(3600),
};

/// Validated policy ready for use by the session controller
#[derive(Debug, Clone)]
pub struct Policy {
    /// Daemon configuration
    pub daemon: DaemonConfig,

    /// Telemetry sink configuration
    pub telemetry: TelemetryConfig,

    /// Compiled matching rules
    pub matcher: MatcherPolicy,
}

impl Policy {
    /// Convert from raw config (after validation)
    pub fn from_raw(raw: RawConfig) -> Self {
        Self {
            daemon: DaemonConfig::from_raw(raw.daemon),
            telemetry: TelemetryConfig::from_raw(raw.telemetry),
            matcher: MatcherPolicy::from_raw(raw.matcher),
        }
    }

    /// Get rule by ID
    pub fn get_rule(&self, id: &str) -> Option<&Rule> {
        self.matcher.rules.iter().find(|r| r.id == id)
    }
}

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// Expected spacing between cycles
    pub cycle: Duration,
    pub data_dir: PathBuf,
    pub counts_file: PathBuf,
}

impl DaemonConfig {
    fn from_raw(raw: RawDaemonConfig) -> Self {
        Self {
            cycle: raw
                .cycle_seconds
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_CYCLE),
            data_dir: raw.data_dir.unwrap_or_else(default_data_dir),
            counts_file: raw
                .counts_file
                .unwrap_or_else(|| PathBuf::from(COUNTS_FILENAME)),
        }
    }

    /// Full path of the counter database
    pub fn counts_path(&self) -> PathBuf {
        self.data_dir.join(&self.counts_file)
    }
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self::from_raw(RawDaemonConfig::default())
    }
}

/// Telemetry configuration
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub enabled: bool,
    pub url: String,
    pub database: String,
    pub timeout: Duration,
}

impl TelemetryConfig {
    fn from_raw(raw: RawTelemetryConfig) -> Self {
        Self {
            enabled: raw.enabled,
            url: raw.url.unwrap_or_else(|| "http://localhost:8086".into()),
            database: raw.database.unwrap_or_else(|| "gsc".into()),
            timeout: Duration::from_secs(raw.timeout_seconds.unwrap_or(10)),
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self::from_raw(RawTelemetryConfig::default())
    }
}

/// Named group of compiled rules
#[derive(Debug, Clone)]
pub struct MatcherPolicy {
    pub name: String,
    pub rules: Vec<Rule>,
}

impl MatcherPolicy {
    fn from_raw(raw: RawMatcher) -> Self {
        let default_limits = raw
            .default_limits
            .map(convert_limits)
            .unwrap_or_else(|| vec![DEFAULT_LIMIT]);

        let rules = raw
            .rules
            .into_iter()
            .map(|r| Rule::from_raw(r, &default_limits))
            .collect();

        Self {
            name: raw.name,
            rules,
        }
    }
}

/// Compiled matching rule
#[derive(Debug, Clone)]
pub struct Rule {
    pub id: String,
    pub include: Vec<Regex>,
    pub exclude: Vec<Regex>,
    /// One quota per unit, never empty
    pub limits: Vec<Limit>,
}

impl Rule {
    fn from_raw(raw: RawRule, default_limits: &[Limit]) -> Self {
        let limits = raw
            .limits
            .map(convert_limits)
            .filter(|l| !l.is_empty())
            .unwrap_or_else(|| default_limits.to_vec());

        Self {
            id: raw.id,
            include: compile(&raw.include),
            exclude: compile(&raw.exclude),
            limits,
        }
    }

    /// Included by at least one pattern and excluded by none
    pub fn is_match(&self, haystack: &str) -> bool {
        self.include.iter().any(|re| re.is_match(haystack))
            && !self.exclude.iter().any(|re| re.is_match(haystack))
    }
}

/// Quota for one unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limit {
    pub unit: UnitKind,
    pub limit: Duration,
}

// Conversion helpers

fn compile(patterns: &[String]) -> Vec<Regex> {
    patterns.iter().filter_map(|p| Regex::new(p).ok()).collect()
}

fn convert_limits(raw: Vec<RawLimit>) -> Vec<Limit> {
    raw.into_iter()
        .filter_map(|l| {
            let unit = parse_unit(&l.unit).ok()?;
            Some(Limit {
                unit,
                limit: Duration::from_secs(l.seconds),
            })
        })
        .collect()
}
