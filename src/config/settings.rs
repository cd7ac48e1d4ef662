//! Configuration structures for deserialisation.
//!
//! These structures map directly to the JSON configuration file format.

use serde::Deserialize;

use crate::error::ConfigError;

/// Root configuration structure.
///
/// This is the top-level structure that matches the JSON config file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Optional JSON schema reference (ignored during parsing).
    #[serde(rename = "$schema", default)]
    _schema: Option<String>,

    /// Optional comment field (ignored during parsing).
    #[serde(rename = "_comment", default)]
    _comment: Option<String>,

    /// Search settings.
    #[serde(default)]
    pub search: SearchConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any validation checks fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.search.locality.is_empty() {
            return Err(ConfigError::ValidationError {
                message: "search.locality must not be empty".to_string(),
            });
        }
        if self.search.locality_spellings.is_empty() {
            return Err(ConfigError::ValidationError {
                message: "search.locality_spellings must list at least one spelling".to_string(),
            });
        }
        if self.search.language_code.is_empty() {
            return Err(ConfigError::ValidationError {
                message: "search.language_code must not be empty".to_string(),
            });
        }
        if self.search.timeout_secs == 0 {
            return Err(ConfigError::ValidationError {
                message: "search.timeout_secs must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

/// Settings for the `search_places` tool and its outbound API call.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SearchConfig {
    /// Display name of the fixed service area, prepended to queries that
    /// do not already mention it.
    #[serde(default = "default_locality")]
    pub locality: String,

    /// Accepted spellings and transliterations of the locality. A query
    /// containing any of these is left unmodified.
    #[serde(default = "default_locality_spellings")]
    pub locality_spellings: Vec<String>,

    /// BCP-47 language code sent to the Places API.
    #[serde(default = "default_language_code")]
    pub language_code: String,

    /// Places API (New) text-search endpoint.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// HTTP timeout for the Places API call, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            locality: default_locality(),
            locality_spellings: default_locality_spellings(),
            language_code: default_language_code(),
            endpoint: default_endpoint(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_locality() -> String {
    "茅ヶ崎".to_string()
}

fn default_locality_spellings() -> Vec<String> {
    vec!["茅ヶ崎".to_string(), "Chigasaki".to_string()]
}

fn default_language_code() -> String {
    "ja".to_string()
}

fn default_endpoint() -> String {
    "https://places.googleapis.com/v1/places:searchText".to_string()
}

const fn default_timeout_secs() -> u64 {
    30
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}
