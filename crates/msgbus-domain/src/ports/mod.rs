//! Port traits
//!
//! | Port | Implemented by |
//! |------|----------------|
//! | [`MessageBroker`] | Backend-driven broker, null broker, test fakes |
//! | [`BrokerBackend`] | NATS JetStream, in-memory backend |

pub mod backend;
pub mod broker;

pub use backend::{
    AckHandle, Acknowledger, BackendResult, BrokerBackend, Delivery, DeliveryStream,
};
pub use broker::MessageBroker;
