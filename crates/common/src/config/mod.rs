//! Configuration management for Papershelf
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config/default, config/{APP_ENV}, config/local)
//! - Default values

use crate::errors::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    /// DOI presentation
    #[serde(default)]
    pub doi: DoiConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Seed import tool configuration
    #[serde(default)]
    pub curator: CuratorConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DoiConfig {
    /// Prefix prepended to a DOI to build its resolver URL
    #[serde(default = "default_doi_url_prefix")]
    pub url_prefix: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub json_logging: bool,

    /// Service name attached to log output
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CuratorConfig {
    /// Seed file used when none is given on the command line
    pub seed_path: Option<String>,

    /// Username the import acts as (created if missing)
    #[serde(default = "default_acting_user")]
    pub acting_user: String,

    /// Approve every imported tag, category and paper
    #[serde(default)]
    pub auto_approve: bool,
}

// Default value functions
fn default_doi_url_prefix() -> String { crate::doi::DEFAULT_DOI_URL_PREFIX.to_string() }
fn default_log_level() -> String { "info".to_string() }
fn default_service_name() -> String { "papershelf".to_string() }
fn default_acting_user() -> String { "curator".to_string() }

impl Default for DoiConfig {
    fn default() -> Self {
        Self {
            url_prefix: default_doi_url_prefix(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: false,
            service_name: default_service_name(),
        }
    }
}

impl Default for CuratorConfig {
    fn default() -> Self {
        Self {
            seed_path: None,
            acting_user: default_acting_user(),
            auto_approve: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))

            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))

            // Load local overrides
            .add_source(File::with_name("config/local").required(false))

            // Load from environment variables with APP__ prefix
            // e.g., APP__DOI__URL_PREFIX=https://dx.doi.org/
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
            )

            .build()?;

        Self::from_config(config)
    }

    fn from_config(config: Config) -> Result<Self> {
        Ok(config.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.doi.url_prefix, "https://doi.org/");
        assert_eq!(config.observability.log_level, "info");
        assert_eq!(config.curator.acting_user, "curator");
        assert!(!config.curator.auto_approve);
    }

    #[test]
    fn test_partial_source_fills_defaults() {
        let source = Config::builder()
            .set_override("doi.url_prefix", "https://dx.doi.org/")
            .unwrap()
            .build()
            .unwrap();
        let config = AppConfig::from_config(source).unwrap();

        assert_eq!(config.doi.url_prefix, "https://dx.doi.org/");
        assert_eq!(config.observability.service_name, "papershelf");
        assert_eq!(config.curator.seed_path, None);
    }

    #[test]
    fn test_bad_value_is_configuration_error() {
        let source = Config::builder()
            .set_override("curator.auto_approve", "maybe")
            .unwrap()
            .build()
            .unwrap();

        let err = AppConfig::from_config(source).unwrap_err();
        assert!(matches!(err, crate::AppError::Configuration { .. }));
        assert_eq!(err.code(), crate::errors::ErrorCode::ConfigurationError);
    }
}
