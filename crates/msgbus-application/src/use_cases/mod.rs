//! Use cases: the broker built from a backend and the caller-facing facade

pub mod message_api;
pub mod provisioned_broker;

pub use message_api::MessageApi;
pub use provisioned_broker::{BrokerSettings, ProvisionedBroker};
