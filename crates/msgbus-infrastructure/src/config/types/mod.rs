//! Configuration types module

pub mod app;
pub mod broker;
pub mod logging;

// Re-export main types
pub use app::AppConfig;
pub use broker::{BrokerConfig, BrokerProvider};
pub use logging::LoggingConfig;
