//! Configuration parsing and validation for gscd
//!
//! Supports TOML configuration with:
//! - Versioned schema
//! - A named matcher holding include/exclude regular expression rules
//! - Per-rule day and week quotas
//! - Validation with clear error messages

mod policy;
mod schema;
mod validation;

pub use policy::*;
pub use schema::*;
pub use validation::*;

use std::path::Path;
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to serialize TOML: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("Validation failed: {errors:?}")]
    ValidationFailed { errors: Vec<ValidationError> },

    #[error("Unsupported config version: {0}")]
    UnsupportedVersion(u32),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Current supported config version
pub const CURRENT_CONFIG_VERSION: u32 = 1;

/// Load and validate configuration from a TOML file
pub fn load_config(path: impl AsRef<Path>) -> ConfigResult<Policy> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse and validate configuration from a TOML string
pub fn parse_config(content: &str) -> ConfigResult<Policy> {
    let raw: RawConfig = toml::from_str(content)?;

    // Check version
    if raw.config_version != CURRENT_CONFIG_VERSION {
        return Err(ConfigError::UnsupportedVersion(raw.config_version));
    }

    // Validate
    let errors = validate_config(&raw);
    if !errors.is_empty() {
        return Err(ConfigError::ValidationFailed { errors });
    }

    // Convert to policy
    Ok(Policy::from_raw(raw))
}

/// Self-describing configuration written next to a missing config file
pub fn example_config() -> RawConfig {
    RawConfig {
        config_version: CURRENT_CONFIG_VERSION,
        daemon: RawDaemonConfig {
            cycle_seconds: Some(DEFAULT_CYCLE.as_secs()),
            data_dir: None,
            counts_file: None,
        },
        telemetry: RawTelemetryConfig::default(),
        matcher: RawMatcher {
            name: "default".into(),
            default_limits: Some(vec![RawLimit {
                unit: DEFAULT_LIMIT.unit.as_str().into(),
                seconds: DEFAULT_LIMIT.limit.as_secs(),
            }]),
            rules: vec![RawRule {
                id: "example".into(),
                include: vec![".*match.*".into(), ".*or_match.*".into()],
                exclude: vec![
                    ".*filter_out.*".into(),
                    ".*filter_also_out.*".into(),
                    ".*filter_out_as_well.*".into(),
                ],
                limits: None,
            }],
        },
    }
}

/// Write a configuration as pretty TOML, creating parent directories
pub fn write_config(path: impl AsRef<Path>, config: &RawConfig) -> ConfigResult<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;

    tracing::debug!(path = %path.display(), "Configuration written");
    Ok(())
}
