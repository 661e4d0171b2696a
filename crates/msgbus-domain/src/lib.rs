//! # msgbus Domain Layer
//!
//! Core types shared by every other msgbus crate:
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`error`] | Closed error taxonomy with wrapped causes |
//! | [`value_objects`] | `OutboundMessage`, `InboundResult` |
//! | [`ports`] | `MessageBroker` capability, `BrokerBackend` remote API, `Delivery` |
//! | [`constants`] | Default deadlines and fixed validation messages |
//!
//! This crate holds no broker-specific code. Adapters live in `msgbus-providers`.

pub mod constants;
pub mod error;
pub mod ports;
pub mod value_objects;

pub use error::{Error, ErrorKind, Result};
pub use ports::{BrokerBackend, MessageBroker};
pub use value_objects::{InboundResult, OutboundMessage};
