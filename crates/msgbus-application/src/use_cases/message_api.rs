//! Message API Use Case
//!
//! The facade callers interact with. Validates input, then dispatches to the
//! configured [`MessageBroker`]. Invalid input never reaches the broker.

use msgbus_domain::constants::{TOPIC_AND_MESSAGE_REQUIRED, TOPIC_AND_SUBSCRIPTION_REQUIRED};
use msgbus_domain::error::{Error, Result};
use msgbus_domain::ports::MessageBroker;
use msgbus_domain::value_objects::{InboundResult, OutboundMessage};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Broker-agnostic publish/receive facade
#[derive(Clone)]
pub struct MessageApi {
    broker: Arc<dyn MessageBroker>,
}

impl MessageApi {
    /// Create a facade over `broker`
    pub fn new(broker: Arc<dyn MessageBroker>) -> Self {
        Self { broker }
    }

    /// Underlying broker
    pub fn broker(&self) -> &Arc<dyn MessageBroker> {
        &self.broker
    }

    /// Publish `message` to `topic` and wait for the broker's acknowledgment
    ///
    /// A message that serializes to JSON `null` (for example `None`) counts as
    /// missing.
    ///
    /// # Errors
    ///
    /// - [`Error::Validation`] for an empty topic or missing message, before
    ///   any broker call
    /// - [`Error::Serialization`] when the message cannot be encoded
    /// - whatever the broker reports otherwise
    pub async fn publish<T: Serialize + ?Sized>(
        &self,
        cancel: &CancellationToken,
        topic: &str,
        message: &T,
    ) -> Result<()> {
        if topic.is_empty() {
            return Err(Error::validation(TOPIC_AND_MESSAGE_REQUIRED));
        }
        let message = OutboundMessage::new(topic, message)?;
        if message.is_empty() {
            return Err(Error::validation(TOPIC_AND_MESSAGE_REQUIRED));
        }
        self.broker.send(cancel, message).await
    }

    /// Stream messages from `subscription` on `topic` into `out`
    ///
    /// Runs until `cancel` fires or the session fails; see
    /// [`MessageBroker::receive`]. Invalid input pushes one validation error
    /// and closes the channel without contacting the broker.
    pub async fn receive(
        &self,
        cancel: CancellationToken,
        topic: &str,
        subscription: &str,
        out: mpsc::Sender<InboundResult>,
    ) {
        if topic.is_empty() || subscription.is_empty() {
            let _ = out
                .send(Err(Error::validation(TOPIC_AND_SUBSCRIPTION_REQUIRED)))
                .await;
            return;
        }
        self.broker.receive(cancel, topic, subscription, out).await;
    }

    /// Run [`receive`](Self::receive) on its own task
    ///
    /// Returns the receiving half of a channel with `capacity` slots and the
    /// task handle. The channel closes when the session ends.
    pub fn spawn_receive(
        &self,
        cancel: CancellationToken,
        topic: impl Into<String>,
        subscription: impl Into<String>,
        capacity: usize,
    ) -> (mpsc::Receiver<InboundResult>, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let api = self.clone();
        let topic = topic.into();
        let subscription = subscription.into();
        let handle = tokio::spawn(async move {
            api.receive(cancel, &topic, &subscription, tx).await;
        });
        (rx, handle)
    }
}

impl std::fmt::Debug for MessageApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageApi")
            .field("provider", &self.broker.provider_name())
            .finish()
    }
}
