//! Null Broker
//!
//! Development stub that logs every publish and never delivers anything.
//!
//! ## Usage
//!
//! ```rust
//! use msgbus_providers::broker::NullBroker;
//!
//! let broker = NullBroker::new();
//! // Publishes are logged and discarded
//! ```

use async_trait::async_trait;
use msgbus_domain::error::{Error, Result};
use msgbus_domain::ports::MessageBroker;
use msgbus_domain::value_objects::{InboundResult, OutboundMessage};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::constants::NULL_PROVIDER_NAME;

/// Null broker for local development
///
/// `send` accepts every message and logs it. `receive` idles until cancelled
/// and then closes the channel without producing results.
#[derive(Debug, Default)]
pub struct NullBroker;

impl NullBroker {
    /// Create a new null broker
    pub fn new() -> Self {
        Self
    }

    /// Create as Arc for sharing
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

#[async_trait]
impl MessageBroker for NullBroker {
    async fn send(&self, cancel: &CancellationToken, message: OutboundMessage) -> Result<()> {
        if cancel.is_cancelled() {
            return Err(Error::cancelled("publish"));
        }
        let message_id = uuid::Uuid::new_v4();
        info!(
            topic = message.topic(),
            message_id = %message_id,
            body = %message.body(),
            "Discarded message"
        );
        Ok(())
    }

    async fn receive(
        &self,
        cancel: CancellationToken,
        topic: &str,
        subscription: &str,
        out: mpsc::Sender<InboundResult>,
    ) {
        info!(
            topic = topic,
            subscription = subscription,
            "Null broker never delivers; waiting for cancellation"
        );
        tokio::select! {
            () = cancel.cancelled() => {}
            () = out.closed() => {}
        }
    }

    fn provider_name(&self) -> &'static str {
        NULL_PROVIDER_NAME
    }
}
