//! Configuration management for the skillshop application
//!
//! Handles loading configuration from files, environment variables,
//! and provides validation for all configuration settings.

use crate::SkillshopError;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure for the skillshop application
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SkillshopConfig {
    /// Geocoding service configuration
    #[serde(default)]
    pub geocoder: GeocoderConfig,
    /// Location store configuration
    #[serde(default)]
    pub store: StoreConfig,
    /// Search defaults
    #[serde(default)]
    pub search: SearchConfig,
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Geocoding service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocoderConfig {
    /// Base URL of a Nominatim-compatible search API
    #[serde(default = "default_geocoder_base_url")]
    pub base_url: String,
    /// Fixed client identifier sent as the User-Agent
    #[serde(default = "default_geocoder_client_id")]
    pub client_id: String,
    /// Request timeout in seconds
    #[serde(default = "default_geocoder_timeout")]
    pub timeout_seconds: u32,
    /// Retries for transient failures (0 = single attempt)
    #[serde(default)]
    pub max_retries: u32,
}

/// Location store settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Directory holding the location database
    #[serde(default = "default_store_path")]
    pub path: String,
}

/// Search defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Radius used when the request carries none or an unreadable one
    #[serde(default = "default_radius_miles")]
    pub default_radius_miles: f64,
    /// Look typed locations up in the store before calling the geocoder
    #[serde(default = "default_reuse_stored_locations")]
    pub reuse_stored_locations: bool,
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    /// Optional JSON file with listings to load on startup
    #[serde(default)]
    pub listings_path: Option<String>,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u32,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (pretty, compact or json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_geocoder_base_url() -> String {
    "https://nominatim.openstreetmap.org".to_string()
}

fn default_geocoder_client_id() -> String {
    "skillshop".to_string()
}

fn default_geocoder_timeout() -> u32 {
    10
}

fn default_store_path() -> String {
    dirs::data_dir()
        .map(|dir| dir.join("skillshop").join("locations"))
        .unwrap_or_else(|| PathBuf::from("skillshop-data").join("locations"))
        .to_string_lossy()
        .into_owned()
}

fn default_radius_miles() -> f64 {
    15.0
}

fn default_reuse_stored_locations() -> bool {
    true
}

fn default_port() -> u16 {
    8080
}

fn default_request_timeout() -> u32 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            base_url: default_geocoder_base_url(),
            client_id: default_geocoder_client_id(),
            timeout_seconds: default_geocoder_timeout(),
            max_retries: 0,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_radius_miles: default_radius_miles(),
            reuse_stored_locations: default_reuse_stored_locations(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            listings_path: None,
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl SkillshopConfig {
    /// Load configuration from `config_path` (or the default location) and
    /// environment variables
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        let config_file = config_path.unwrap_or_else(|| {
            Self::get_config_path().unwrap_or_else(|| PathBuf::from("config.toml"))
        });

        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // SKILLSHOP_GEOCODER__TIMEOUT_SECONDS=5 etc.
        builder = builder.add_source(
            Environment::with_prefix("SKILLSHOP")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: SkillshopConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        config.apply_defaults();
        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("skillshop").join("config.toml"))
    }

    /// Apply default values to missing configuration fields
    pub fn apply_defaults(&mut self) {
        if self.geocoder.base_url.is_empty() {
            self.geocoder.base_url = default_geocoder_base_url();
        }
        if self.geocoder.client_id.is_empty() {
            self.geocoder.client_id = default_geocoder_client_id();
        }
        if self.geocoder.timeout_seconds == 0 {
            self.geocoder.timeout_seconds = default_geocoder_timeout();
        }
        if self.store.path.is_empty() {
            self.store.path = default_store_path();
        }
        if self.search.default_radius_miles <= 0.0 {
            self.search.default_radius_miles = default_radius_miles();
        }
        if self.server.port == 0 {
            self.server.port = default_port();
        }
        if self.server.request_timeout_seconds == 0 {
            self.server.request_timeout_seconds = default_request_timeout();
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> std::result::Result<(), SkillshopError> {
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        Ok(())
    }

    fn validate_numeric_ranges(&self) -> std::result::Result<(), SkillshopError> {
        if self.geocoder.timeout_seconds > 120 {
            return Err(SkillshopError::config(
                "Geocoder timeout cannot exceed 120 seconds",
            ));
        }

        if self.geocoder.max_retries > 5 {
            return Err(SkillshopError::config("Geocoder max retries cannot exceed 5"));
        }

        if !self.search.default_radius_miles.is_finite() || self.search.default_radius_miles > 500.0
        {
            return Err(SkillshopError::config(
                "Default search radius cannot exceed 500 miles",
            ));
        }

        if self.server.request_timeout_seconds > 300 {
            return Err(SkillshopError::config(
                "Request timeout cannot exceed 300 seconds",
            ));
        }

        Ok(())
    }

    fn validate_string_values(&self) -> std::result::Result<(), SkillshopError> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(SkillshopError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            )));
        }

        let valid_log_formats = ["pretty", "compact", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(SkillshopError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            )));
        }

        if !self.geocoder.base_url.starts_with("http://")
            && !self.geocoder.base_url.starts_with("https://")
        {
            return Err(SkillshopError::config(
                "Geocoder base URL must be a valid HTTP or HTTPS URL",
            ));
        }

        if self.geocoder.client_id.trim().is_empty() {
            return Err(SkillshopError::config("Geocoder client id cannot be blank"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = SkillshopConfig::default();
        assert_eq!(config.geocoder.base_url, "https://nominatim.openstreetmap.org");
        assert_eq!(config.geocoder.client_id, "skillshop");
        assert_eq!(config.geocoder.timeout_seconds, 10);
        assert_eq!(config.geocoder.max_retries, 0);
        assert_eq!(config.search.default_radius_miles, 15.0);
        assert!(config.search.reuse_stored_locations);
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_invalid_log_level() {
        let mut config = SkillshopConfig::default();
        config.logging.level = "invalid".to_string();
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Invalid log level"));
    }

    #[test]
    fn test_config_validation_numeric_ranges() {
        let mut config = SkillshopConfig::default();
        config.geocoder.timeout_seconds = 500;
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("timeout cannot exceed"));
    }

    #[test]
    fn test_config_validation_base_url() {
        let mut config = SkillshopConfig::default();
        config.geocoder.base_url = "ftp://example.com".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_apply_defaults_fills_zeroes() {
        let mut config = SkillshopConfig::default();
        config.geocoder.timeout_seconds = 0;
        config.search.default_radius_miles = -3.0;
        config.logging.format = String::new();
        config.apply_defaults();
        assert_eq!(config.geocoder.timeout_seconds, 10);
        assert_eq!(config.search.default_radius_miles, 15.0);
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn test_load_from_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[geocoder]
base_url = "http://127.0.0.1:7070"
timeout_seconds = 3

[search]
default_radius_miles = 25.0

[logging]
format = "json"
"#
        )
        .unwrap();

        let config = SkillshopConfig::load_from_path(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(config.geocoder.base_url, "http://127.0.0.1:7070");
        assert_eq!(config.geocoder.timeout_seconds, 3);
        assert_eq!(config.geocoder.client_id, "skillshop");
        assert_eq!(config.search.default_radius_miles, 25.0);
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_config_path_generation() {
        if let Some(path) = SkillshopConfig::get_config_path() {
            assert!(path.to_string_lossy().contains("skillshop"));
            assert!(path.to_string_lossy().ends_with("config.toml"));
        }
    }
}
