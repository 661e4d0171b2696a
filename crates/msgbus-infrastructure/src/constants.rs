//! Infrastructure layer constants
//!
//! Contains constants that are part of the infrastructure implementation.
//! Broker defaults are defined in `msgbus_domain::constants`.

// ============================================================================
// CONFIGURATION CONSTANTS
// ============================================================================

/// Default configuration file name
pub const DEFAULT_CONFIG_FILENAME: &str = "msgbus.toml";

/// Default configuration directory name
pub const DEFAULT_CONFIG_DIR: &str = "msgbus";

/// Environment variable prefix for configuration
pub const CONFIG_ENV_PREFIX: &str = "MSGBUS";

/// Separator between nested keys in environment variable names
pub const CONFIG_ENV_SEPARATOR: &str = "__";

// ============================================================================
// LOGGING CONSTANTS
// ============================================================================

/// Default log level
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Environment variable overriding the configured log filter
pub const LOG_FILTER_ENV: &str = "MSGBUS_LOG";

/// Maximum number of rotated log files to keep
pub const LOG_MAX_FILES: usize = 5;

// ============================================================================
// BROKER CONSTANTS
// ============================================================================

/// Default connection timeout in milliseconds for networked brokers
pub const DEFAULT_CONNECTION_TIMEOUT_MS: u64 = 5_000;
