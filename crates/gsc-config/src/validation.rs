//! Configuration validation

use crate::policy::MAX_CYCLE;
use crate::schema::{RawConfig, RawLimit, RawRule};
use gsc_util::UnitKind;
use regex::Regex;
use std::collections::HashSet;
use thiserror::Error;

/// Validation error
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("Rule '{rule_id}': {message}")]
    RuleError { rule_id: String, message: String },

    #[error("Duplicate rule ID: {0}")]
    DuplicateRuleId(String),

    #[error("Invalid pattern '{pattern}' in rule '{rule_id}': {message}")]
    InvalidPattern {
        rule_id: String,
        pattern: String,
        message: String,
    },

    #[error("Invalid limit in {scope}: {message}")]
    InvalidLimit { scope: String, message: String },

    #[error("Global config error: {0}")]
    GlobalError(String),
}

/// Validate a raw configuration
pub fn validate_config(config: &RawConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    match config.daemon.cycle_seconds {
        Some(0) => errors.push(ValidationError::GlobalError(
            "cycle_seconds must be greater than zero".into(),
        )),
        Some(secs) if secs > MAX_CYCLE.as_secs() => {
            errors.push(ValidationError::GlobalError(format!(
                "cycle_seconds must be at most {} (one week), got {}",
                MAX_CYCLE.as_secs(),
                secs
            )))
        }
        _ => {}
    }

    if let Some(limits) = &config.matcher.default_limits {
        errors.extend(validate_limits(limits, "matcher default_limits"));
    }

    // Check for duplicate rule IDs
    let mut seen_ids = HashSet::new();
    for rule in &config.matcher.rules {
        if !seen_ids.insert(&rule.id) {
            errors.push(ValidationError::DuplicateRuleId(rule.id.clone()));
        }
    }

    for rule in &config.matcher.rules {
        errors.extend(validate_rule(rule));
    }

    errors
}

fn validate_rule(rule: &RawRule) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if rule.id.trim().is_empty() {
        errors.push(ValidationError::RuleError {
            rule_id: rule.id.clone(),
            message: "id cannot be empty".into(),
        });
    }

    if rule.include.is_empty() {
        errors.push(ValidationError::RuleError {
            rule_id: rule.id.clone(),
            message: "include must list at least one pattern".into(),
        });
    }

    for pattern in rule.include.iter().chain(&rule.exclude) {
        if let Err(e) = Regex::new(pattern) {
            errors.push(ValidationError::InvalidPattern {
                rule_id: rule.id.clone(),
                pattern: pattern.clone(),
                message: e.to_string(),
            });
        }
    }

    if let Some(limits) = &rule.limits {
        errors.extend(validate_limits(limits, &format!("rule '{}'", rule.id)));
    }

    errors
}

fn validate_limits(limits: &[RawLimit], scope: &str) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mut seen_units = HashSet::new();

    for limit in limits {
        match parse_unit(&limit.unit) {
            Ok(unit) => {
                if !seen_units.insert(unit) {
                    errors.push(ValidationError::InvalidLimit {
                        scope: scope.to_string(),
                        message: format!("unit '{}' listed twice", limit.unit),
                    });
                }
            }
            Err(message) => errors.push(ValidationError::InvalidLimit {
                scope: scope.to_string(),
                message,
            }),
        }

        if limit.seconds == 0 {
            errors.push(ValidationError::InvalidLimit {
                scope: scope.to_string(),
                message: format!("{} limit must be greater than zero", limit.unit),
            });
        }
    }

    errors
}

/// Parse a unit name ("day" or "week")
pub fn parse_unit(s: &str) -> Result<UnitKind, String> {
    s.parse::<UnitKind>().map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::RawMatcher;

    fn rule(id: &str, include: &[&str]) -> RawRule {
        RawRule {
            id: id.into(),
            include: include.iter().map(|s| s.to_string()).collect(),
            exclude: vec![],
            limits: None,
        }
    }

    fn config_with_rules(rules: Vec<RawRule>) -> RawConfig {
        RawConfig {
            config_version: 1,
            daemon: Default::default(),
            telemetry: Default::default(),
            matcher: RawMatcher {
                rules,
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_parse_unit() {
        assert_eq!(parse_unit("day").unwrap(), UnitKind::Day);
        assert_eq!(parse_unit("WEEK").unwrap(), UnitKind::Week);
        assert!(parse_unit("fortnight").is_err());
    }

    #[test]
    fn test_valid_config_has_no_errors() {
        let config = config_with_rules(vec![rule("game", &[".*game.*"])]);
        assert!(validate_config(&config).is_empty());
    }

    #[test]
    fn test_duplicate_id_detection() {
        let config = config_with_rules(vec![rule("game", &["a"]), rule("game", &["b"])]);

        let errors = validate_config(&config);
        assert!(errors.iter().any(|e| matches!(e, ValidationError::DuplicateRuleId(_))));
    }

    #[test]
    fn test_invalid_pattern() {
        let mut bad = rule("game", &["(unclosed"]);
        bad.exclude = vec!["[".into()];
        let config = config_with_rules(vec![bad]);

        let errors = validate_config(&config);
        let patterns: Vec<_> = errors
            .iter()
            .filter(|e| matches!(e, ValidationError::InvalidPattern { .. }))
            .collect();
        assert_eq!(patterns.len(), 2);
    }

    #[test]
    fn test_empty_include_and_id() {
        let config = config_with_rules(vec![rule("", &[])]);

        let errors = validate_config(&config);
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().all(|e| matches!(e, ValidationError::RuleError { .. })));
    }

    #[test]
    fn test_invalid_limits() {
        let mut limited = rule("game", &["game"]);
        limited.limits = Some(vec![
            RawLimit {
                unit: "day".into(),
                seconds: 0,
            },
            RawLimit {
                unit: "day".into(),
                seconds: 60,
            },
            RawLimit {
                unit: "month".into(),
                seconds: 60,
            },
        ]);
        let config = config_with_rules(vec![limited]);

        let errors = validate_config(&config);
        assert_eq!(errors.len(), 3);
        assert!(errors.iter().all(|e| matches!(e, ValidationError::InvalidLimit { .. })));
    }

    #[test]
    fn test_zero_cycle_rejected() {
        let mut config = config_with_rules(vec![]);
        config.daemon.cycle_seconds = Some(0);

        let errors = validate_config(&config);
        assert!(matches!(errors.as_slice(), [ValidationError::GlobalError(_)]));
    }

    #[test]
    fn test_cycle_capped_at_one_week() {
        let mut config = config_with_rules(vec![]);
        config.daemon.cycle_seconds = Some(MAX_CYCLE.as_secs());
        assert!(validate_config(&config).is_empty());

        config.daemon.cycle_seconds = Some(MAX_CYCLE.as_secs() + 1);
        let errors = validate_config(&config);
        assert!(matches!(errors.as_slice(), [ValidationError::GlobalError(_)]));

        config.daemon.cycle_seconds = Some(9_000_000_000_000_000_000);
        assert_eq!(validate_config(&config).len(), 1);
    }
}
