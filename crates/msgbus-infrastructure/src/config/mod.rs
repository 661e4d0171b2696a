//! Configuration management
//!
//! Layered configuration: built-in defaults, then an optional TOML file,
//! then `MSGBUS_` environment variables.

pub mod loader;
pub mod types;

pub use loader::{ConfigBuilder, ConfigLoader};
pub use types::*;
