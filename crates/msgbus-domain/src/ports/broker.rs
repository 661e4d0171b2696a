//! Broker Capability Port
//!
//! The two operations every broker adapter provides. Callers go through the
//! `MessageApi` facade, which validates input before reaching this port.
//!
//! ## Usage
//!
//! ```no_run
//! use msgbus_domain::ports::MessageBroker;
//! use msgbus_domain::value_objects::OutboundMessage;
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! async fn announce(broker: Arc<dyn MessageBroker>) -> msgbus_domain::Result<()> {
//!     let message = OutboundMessage::new("orders", &serde_json::json!({"id": 1}))?;
//!     broker.send(&CancellationToken::new(), message).await
//! }
//! ```

use crate::error::Result;
use crate::value_objects::{InboundResult, OutboundMessage};
use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Broker-agnostic publish/receive capability
#[async_trait]
pub trait MessageBroker: Send + Sync {
    /// Publish one message and wait for the broker's acknowledgment
    ///
    /// Returns only after the broker confirmed receipt or reported failure.
    async fn send(&self, cancel: &CancellationToken, message: OutboundMessage) -> Result<()>;

    /// Stream messages from `subscription` on `topic` into `out`
    ///
    /// Runs until `cancel` fires or the session fails. Pushes zero or more
    /// payloads followed by at most one error. `out` is dropped on return,
    /// which closes the channel exactly once.
    async fn receive(
        &self,
        cancel: CancellationToken,
        topic: &str,
        subscription: &str,
        out: mpsc::Sender<InboundResult>,
    );

    /// Short provider name for logs
    fn provider_name(&self) -> &'static str;
}
