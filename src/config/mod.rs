//! Configuration file loading and parsing.
//!
//! This module handles loading the configuration file from disk and parsing
//! it into validated, type-safe structures, plus loading the `MAPS_API_KEY`
//! secret from the process environment.
//!
//! # Configuration File Locations
//!
//! The configuration file is searched in the following order:
//!
//! 1. Path specified via `--config` CLI flag
//! 2. Default location:
//!    - **Linux/macOS:** `~/.chigasaki-gourmet-mcp/config.json`
//!    - **Windows:** `%USERPROFILE%\.chigasaki-gourmet-mcp\config.json`
//!
//! Unlike the config path given on the command line, a missing default file
//! is not an error: the server must be spawnable by a client with zero
//! setup, so built-in defaults are used instead.
//!
//! # Secrets
//!
//! The Places API key is never part of the config file. It is read from
//! the `MAPS_API_KEY` environment variable, optionally populated from a
//! `.env` file in the working directory before the server starts. A
//! missing key is only reported when the tool is actually invoked.

mod settings;

pub use settings::{Config, LoggingConfig, SearchConfig};

use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Environment variable holding the Places API key.
pub const API_KEY_VAR: &str = "MAPS_API_KEY";

/// Returns the default configuration directory.
///
/// - **Linux/macOS:** `~/.chigasaki-gourmet-mcp/`
/// - **Windows:** `%USERPROFILE%\.chigasaki-gourmet-mcp\`
#[must_use]
pub fn default_config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|p| p.join(".chigasaki-gourmet-mcp"))
}

/// Returns the platform-specific default configuration file path.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    default_config_dir().map(|p| p.join("config.json"))
}

/// Loads and parses the configuration file.
///
/// If `path` is `None`, the platform-specific default location is tried;
/// when no file exists there, built-in defaults are returned. An explicit
/// `path` must exist.
///
/// # Errors
///
/// Returns an error if:
/// - An explicitly requested configuration file cannot be found
/// - The file cannot be read
/// - The JSON is malformed
/// - A field fails validation
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(ConfigError::NotFound {
                    path: p.to_path_buf(),
                });
            }
            p.to_path_buf()
        }
        None => match default_config_path() {
            Some(p) if p.exists() => p,
            _ => {
                let config = Config::default();
                config.validate()?;
                return Ok(config);
            }
        },
    };

    let contents = std::fs::read_to_string(&config_path).map_err(|e| ConfigError::ReadError {
        path: config_path.clone(),
        source: e,
    })?;

    let config: Config = serde_json::from_str(&contents).map_err(|e| ConfigError::ParseError {
        path: config_path.clone(),
        source: e,
    })?;

    // Validate the configuration
    config.validate()?;

    Ok(config)
}

/// Loads a `.env` file from the working directory, if one exists.
///
/// Missing files are silently ignored; variables already present in the
/// environment are not overwritten.
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

/// Reads the Places API key from the environment.
///
/// Returns `None` when the variable is unset or empty. Callers decide when
/// absence matters: the server starts without a key and only the tool
/// invocation reports it.
#[must_use]
pub fn api_key_from_env() -> Option<String> {
    std::env::var(API_KEY_VAR)
        .ok()
        .filter(|key| !key.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_dir_exists() {
        assert!(default_config_dir().is_some());
    }

    #[test]
    fn default_config_path_exists() {
        let path = default_config_path();
        assert!(path.is_some());
        assert!(path.unwrap().to_string_lossy().contains("config.json"));
    }

    #[test]
    fn explicit_missing_path_is_an_error() {
        let result = load_config(Some(Path::new("/nonexistent/config.json")));
        assert!(matches!(result, Err(ConfigError::NotFound { .. })));
    }

    #[test]
    fn load_explicit_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"search": {"locality": "平塚"}, "logging": {"level": "info"}}"#,
        )
        .unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.search.locality, "平塚");
        assert_eq!(config.logging.level, "info");
        // Unspecified fields fall back to defaults
        assert_eq!(config.search.timeout_secs, 30);
    }

    #[test]
    fn malformed_config_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        let result = load_config(Some(&path));
        assert!(matches!(result, Err(ConfigError::ParseError { .. })));
    }
}
