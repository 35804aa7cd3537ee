//! Default paths for gscd components
//!
//! All defaults are relative to the working directory the daemon is started in:
//! - Configuration: `etc/gsc.config.toml`
//! - Example configuration: `etc/gsc.config.example.toml` (written on first run)
//! - Counters: `gsc.counts.db` inside the data directory

use std::path::{Path, PathBuf};

/// Environment variable for overriding the data directory
pub const GSC_DATA_DIR_ENV: &str = "GSC_DATA_DIR";

/// Directory holding configuration files
const CONFIG_DIR: &str = "etc";

/// Configuration filename within the configuration directory
const CONFIG_FILENAME: &str = "gsc.config.toml";

/// Extension replacing the configuration extension for the example file
const EXAMPLE_EXTENSION: &str = "example.toml";

/// Counter database filename within the data directory
pub const COUNTS_FILENAME: &str = "gsc.counts.db";

/// Get the default configuration file path (`etc/gsc.config.toml`).
pub fn default_config_path() -> PathBuf {
    PathBuf::from(CONFIG_DIR).join(CONFIG_FILENAME)
}

/// Get the default data directory.
///
/// Order of precedence:
/// 1. `$GSC_DATA_DIR` environment variable (if set)
/// 2. The current working directory
pub fn default_data_dir() -> PathBuf {
    if let Ok(path) = std::env::var(GSC_DATA_DIR_ENV) {
        return PathBuf::from(path);
    }

    PathBuf::from(".")
}

/// Sibling path where an example configuration is materialized when the
/// configuration at `config_path` is missing.
///
/// `etc/gsc.config.toml` becomes `etc/gsc.config.example.toml`.
pub fn example_config_path(config_path: &Path) -> PathBuf {
    config_path.with_extension(EXAMPLE_EXTENSION)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_path_is_under_etc() {
        let path = default_config_path();
        assert_eq!(path, Path::new("etc").join("gsc.config.toml"));
    }

    #[test]
    fn example_path_is_sibling() {
        let example = example_config_path(&default_config_path());
        assert_eq!(example, Path::new("etc").join("gsc.config.example.toml"));
        assert_eq!(example.parent(), default_config_path().parent());
    }

    #[test]
    fn example_path_without_extension() {
        let example = example_config_path(Path::new("/tmp/gsc"));
        assert_eq!(example, Path::new("/tmp/gsc.example.toml"));
    }

    #[test]
    fn data_dir_defaults_to_working_directory() {
        if std::env::var_os(GSC_DATA_DIR_ENV).is_none() {
            assert_eq!(default_data_dir(), PathBuf::from("."));
        }
    }
}
