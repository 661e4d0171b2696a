//! Main application configuration

use serde::{Deserialize, Serialize};

use super::broker::BrokerConfig;
use super::logging::LoggingConfig;

/// Root configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Broker selection and tuning
    #[serde(default)]
    pub broker: BrokerConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}
