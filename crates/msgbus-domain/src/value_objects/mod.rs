//! Value objects exchanged between callers and brokers

pub mod message;

pub use message::{InboundResult, OutboundMessage};
