//! Configuration loader
//!
//! Handles loading configuration from various sources including
//! TOML files, environment variables, and default values.

use crate::config::{AppConfig, BrokerConfig, BrokerProvider, LoggingConfig};
use crate::constants::*;
use crate::error_ext::ErrorContext;
use crate::logging::{log_config_loaded, parse_log_level};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use msgbus_domain::constants::PROJECT_ID_REQUIRED;
use msgbus_domain::error::{Error, Result};
use std::env;
use std::path::{Path, PathBuf};

/// Configuration loader service
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Configuration file path
    config_path: Option<PathBuf>,

    /// Environment prefix
    env_prefix: String,
}

impl ConfigLoader {
    /// Create a new configuration loader with default settings
    pub fn new() -> Self {
        Self {
            config_path: None,
            env_prefix: CONFIG_ENV_PREFIX.to_string(),
        }
    }

    /// Set the configuration file path
    pub fn with_config_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Set the environment variable prefix
    pub fn with_env_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Load configuration from all sources
    ///
    /// Configuration sources are merged in this order (later sources override earlier):
    /// 1. Default values from `AppConfig::default()`
    /// 2. TOML configuration file (if exists)
    /// 3. Environment variables with prefix (e.g., `MSGBUS_BROKER__PROVIDER`)
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] when a source cannot be parsed or the
    /// merged configuration fails validation.
    pub fn load(&self) -> Result<AppConfig> {
        let mut figment = Figment::new().merge(Serialized::defaults(AppConfig::default()));

        if let Some(config_path) = &self.config_path {
            if config_path.exists() {
                figment = figment.merge(Toml::file(config_path));
                log_config_loaded(config_path, true);
            } else {
                log_config_loaded(config_path, false);
            }
        } else if let Some(default_path) = Self::find_default_config_path() {
            figment = figment.merge(Toml::file(&default_path));
            log_config_loaded(&default_path, true);
        }

        // Double underscore separates nested keys (e.g., MSGBUS_BROKER__NATS_URL)
        figment = figment.merge(
            Env::prefixed(&format!("{}_", self.env_prefix)).split(CONFIG_ENV_SEPARATOR),
        );

        let app_config: AppConfig = figment
            .extract()
            .context("Failed to extract configuration")?;

        validate_app_config(&app_config)?;

        Ok(app_config)
    }

    /// Save configuration to file
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] when serialization or the write fails.
    pub fn save_to_file<P: AsRef<Path>>(&self, config: &AppConfig, path: P) -> Result<()> {
        let toml_string =
            toml::to_string_pretty(config).context("Failed to serialize config to TOML")?;

        std::fs::write(path.as_ref(), toml_string).with_context(|| {
            format!("Failed to write config file {}", path.as_ref().display())
        })?;

        Ok(())
    }

    /// Get the current configuration file path
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    /// Find the first existing configuration file in the default locations
    fn find_default_config_path() -> Option<PathBuf> {
        let current_dir = env::current_dir().ok()?;

        let candidates = [
            Some(current_dir.join(DEFAULT_CONFIG_FILENAME)),
            Some(
                current_dir
                    .join(DEFAULT_CONFIG_DIR)
                    .join(DEFAULT_CONFIG_FILENAME),
            ),
            dirs::config_dir().map(|d| d.join(DEFAULT_CONFIG_DIR).join(DEFAULT_CONFIG_FILENAME)),
        ];

        candidates.into_iter().flatten().find(|path| path.exists())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Validate application configuration
///
/// # Errors
///
/// Returns [`Error::Configuration`] describing the first invalid value.
pub fn validate_app_config(config: &AppConfig) -> Result<()> {
    validate_broker_config(&config.broker)?;
    validate_logging_config(&config.logging)?;
    Ok(())
}

/// Validate broker configuration
///
/// # Errors
///
/// Returns [`Error::Configuration`] describing the first invalid value.
pub fn validate_broker_config(config: &BrokerConfig) -> Result<()> {
    if config.provider == BrokerProvider::Nats {
        if config.nats_url.as_deref().is_none_or(|url| url.trim().is_empty()) {
            return Err(Error::configuration(
                "NATS URL is required when the nats provider is selected",
            ));
        }
        if config.project_id.trim().is_empty() {
            return Err(Error::configuration(PROJECT_ID_REQUIRED));
        }
    }
    if config.connection_timeout_ms == 0 {
        return Err(Error::configuration("Connection timeout cannot be 0"));
    }
    if config.publish_timeout_ms == 0 {
        return Err(Error::configuration("Publish timeout cannot be 0"));
    }
    if config.provision_timeout_ms == 0 {
        return Err(Error::configuration("Provisioning timeout cannot be 0"));
    }
    if config.ack_wait_secs == 0 {
        return Err(Error::configuration("Ack wait cannot be 0"));
    }
    if config.max_concurrent_deliveries == 0 {
        return Err(Error::configuration(
            "Maximum concurrent deliveries cannot be 0",
        ));
    }
    if config.channel_capacity == 0 {
        return Err(Error::configuration("Channel capacity cannot be 0"));
    }
    Ok(())
}

fn validate_logging_config(config: &LoggingConfig) -> Result<()> {
    parse_log_level(&config.level)?;
    Ok(())
}

/// Configuration builder for programmatic configuration
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    config: AppConfig,
}

impl ConfigBuilder {
    /// Create a new configuration builder with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set broker configuration
    pub fn with_broker(mut self, broker: BrokerConfig) -> Self {
        self.config.broker = broker;
        self
    }

    /// Select the broker provider
    pub fn with_provider(mut self, provider: BrokerProvider) -> Self {
        self.config.broker.provider = provider;
        self
    }

    /// Set the project namespace
    pub fn with_project_id<S: Into<String>>(mut self, project_id: S) -> Self {
        self.config.broker.project_id = project_id.into();
        self
    }

    /// Set logging configuration
    pub fn with_logging(mut self, logging: LoggingConfig) -> Self {
        self.config.logging = logging;
        self
    }

    /// Build the configuration
    pub fn build(self) -> AppConfig {
        self.config
    }
}
