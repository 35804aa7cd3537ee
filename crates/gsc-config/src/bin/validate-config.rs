//! Config validation CLI tool
//!
//! Validates a gscd configuration file and reports any errors.

use gsc_util::{default_config_path, format_duration};
use std::path::PathBuf;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    let config_path = match args.get(1) {
        Some(path) => PathBuf::from(path),
        None => {
            let default_path = default_config_path();
            eprintln!("Usage: validate-config [config-file]");
            eprintln!();
            eprintln!("Validates a gscd configuration file.");
            eprintln!();
            eprintln!("If no path is provided, uses: {}", default_path.display());
            eprintln!();
            eprintln!("Example:");
            eprintln!("  validate-config {}", default_path.display());
            eprintln!("  validate-config etc/gsc.config.example.toml");
            return ExitCode::from(2);
        }
    };

    // Check file exists
    if !config_path.exists() {
        eprintln!("Error: Configuration file not found: {}", config_path.display());
        return ExitCode::from(1);
    }

    // Try to load and validate
    match gsc_config::load_config(&config_path) {
        Ok(policy) => {
            println!("✓ Configuration is valid");
            println!();
            println!("Summary:");
            println!("  Config version: {}", gsc_config::CURRENT_CONFIG_VERSION);
            println!("  Cycle: {}", format_duration(policy.daemon.cycle));
            println!("  Counters: {}", policy.daemon.counts_path().display());
            println!(
                "  Telemetry: {}",
                if policy.telemetry.enabled {
                    format!("{} (db {})", policy.telemetry.url, policy.telemetry.database)
                } else {
                    "disabled".to_string()
                }
            );
            println!("  Matcher: {}", policy.matcher.name);
            println!("  Rules: {}", policy.matcher.rules.len());

            if !policy.matcher.rules.is_empty() {
                println!();
                println!("Rules:");
                for rule in &policy.matcher.rules {
                    let limits: Vec<String> = rule
                        .limits
                        .iter()
                        .map(|l| format!("{} {}", l.unit.as_str(), format_duration(l.limit)))
                        .collect();
                    println!(
                        "  - {} [{} include, {} exclude]: {}",
                        rule.id,
                        rule.include.len(),
                        rule.exclude.len(),
                        limits.join(", ")
                    );
                }
            }

            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("✗ Configuration validation failed");
            eprintln!();
            match &e {
                gsc_config::ConfigError::ReadError(io_err) => {
                    eprintln!("Failed to read file: {}", io_err);
                }
                gsc_config::ConfigError::ParseError(parse_err) => {
                    eprintln!("TOML parse error:");
                    eprintln!("  {}", parse_err);
                }
                gsc_config::ConfigError::SerializeError(ser_err) => {
                    eprintln!("TOML serialize error: {}", ser_err);
                }
                gsc_config::ConfigError::ValidationFailed { errors } => {
                    eprintln!("Validation errors ({}):", errors.len());
                    for err in errors {
                        eprintln!("  - {}", err);
                    }
                }
                gsc_config::ConfigError::UnsupportedVersion(ver) => {
                    eprintln!(
                        "Unsupported config version: {} (expected {})",
                        ver,
                        gsc_config::CURRENT_CONFIG_VERSION
                    );
                }
            }
            ExitCode::from(1)
        }
    }
}
