//! Application Layer - msgbus
//!
//! Orchestrates the messaging contract on top of the domain ports:
//!
//! - [`domain_services::Provisioner`]: get-or-create topics and subscriptions,
//!   one resolution per name
//! - [`use_cases::ProvisionedBroker`]: publish and receive paths for any
//!   [`BrokerBackend`](msgbus_domain::BrokerBackend)
//! - [`use_cases::MessageApi`]: the validating facade callers use
//!
//! ## Dependencies
//!
//! This crate depends only on:
//! - `msgbus-domain`: error taxonomy, message types and ports
//! - Pure Rust libraries for async, concurrency and logging

pub mod domain_services;
pub mod use_cases;

pub use domain_services::*;
pub use use_cases::*;
