//! Broker Provider Implementations
//!
//! ## Available Providers
//!
//! | Provider | Type | Description |
//! |----------|------|-------------|
//! | NullBroker | Development | Logs every publish, idles on receive |
//! | InMemoryBroker | In-Process | Topics and subscriptions in process memory |
//! | NatsBroker | Distributed | NATS JetStream streams and durable consumers |
//!
//! ## Provider Selection Guide
//!
//! - **Local development without a broker**: `NullBroker`
//! - **Single process / tests**: `InMemoryBroker`
//! - **Distributed**: `NatsBroker`

pub mod memory;
#[cfg(feature = "broker-nats")]
pub mod nats;
pub mod null;

use msgbus_application::ProvisionedBroker;

pub use memory::InMemoryBackend;
#[cfg(feature = "broker-nats")]
pub use nats::{JetStreamBackend, NatsSettings};
pub use null::NullBroker;

/// Broker over the in-process backend
pub type InMemoryBroker = ProvisionedBroker<InMemoryBackend>;

/// Broker over NATS JetStream
#[cfg(feature = "broker-nats")]
pub type NatsBroker = ProvisionedBroker<JetStreamBackend>;
