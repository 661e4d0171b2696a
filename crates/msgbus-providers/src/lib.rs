//! # msgbus - Broker Implementations
//!
//! Concrete adapters for the ports defined in `msgbus-domain`.
//!
//! | Provider | Port | Description |
//! |----------|------|-------------|
//! | `JetStreamBackend` | `BrokerBackend` | NATS JetStream streams and durable consumers |
//! | `InMemoryBackend` | `BrokerBackend` | In-process broker for local development |
//! | `NullBroker` | `MessageBroker` | Logs publishes, never delivers |
//!
//! ## Feature Flags
//!
//! ```toml
//! [dependencies]
//! msgbus-providers = { version = "0.1", features = ["broker-nats"] }
//! ```

// Re-export domain types commonly used with providers
pub use msgbus_domain::error::{Error, Result};
pub use msgbus_domain::ports::{BrokerBackend, MessageBroker};

/// Provider-specific constants
pub mod constants;

/// Broker implementations
pub mod broker;
