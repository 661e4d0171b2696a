//! Broker wiring
//!
//! Builds brokers and the message facade from configuration. Provider
//! implementations come from `msgbus-providers`; this module only selects
//! and wires them.

pub mod factory;

pub use factory::{BrokerFactory, MessageApiFactory};
