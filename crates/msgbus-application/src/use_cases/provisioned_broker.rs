//! Backend-driven broker
//!
//! Implements [`MessageBroker`] for any [`BrokerBackend`]:
//!
//! - **Publish**: encode, resolve topic, submit, wait for the broker's ack
//!   under a fixed deadline.
//! - **Receive**: resolve subscription, open a delivery stream and hand each
//!   payload to the output channel, acknowledging only after the handoff.
//!
//! ## Receive session
//!
//! ```text
//! Provisioning -> Listening -> Delivering* -> Terminated
//! ```
//!
//! Any failure pushes one final error result. Cancellation, or the consumer
//! dropping its receiver, ends the session without an error result. The output sender is owned by the session and
//! dropped on return, which closes the channel exactly once.

use async_trait::async_trait;
use futures::TryStreamExt;
use msgbus_domain::constants::{
    DEFAULT_MAX_CONCURRENT_DELIVERIES, DEFAULT_PROVISION_TIMEOUT, DEFAULT_PUBLISH_TIMEOUT,
};
use msgbus_domain::error::{Error, Result};
use msgbus_domain::ports::{BrokerBackend, Delivery, MessageBroker};
use msgbus_domain::value_objects::{InboundResult, OutboundMessage};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::domain_services::Provisioner;

/// Tuning for a [`ProvisionedBroker`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrokerSettings {
    /// Deadline for one publish round trip
    pub publish_timeout: Duration,
    /// Deadline for each provisioning call
    pub provision_timeout: Duration,
    /// Deliveries handed off concurrently within one receive session
    pub max_concurrent_deliveries: usize,
}

impl Default for BrokerSettings {
    fn default() -> Self {
        Self {
            publish_timeout: DEFAULT_PUBLISH_TIMEOUT,
            provision_timeout: DEFAULT_PROVISION_TIMEOUT,
            max_concurrent_deliveries: DEFAULT_MAX_CONCURRENT_DELIVERIES,
        }
    }
}

/// Why a delivery loop stopped early
enum Stop {
    /// The caller dropped the receiving half of the channel
    ConsumerGone,
    /// Fatal listening error
    Failed(Error),
}

/// [`MessageBroker`] backed by a remote [`BrokerBackend`]
pub struct ProvisionedBroker<B: BrokerBackend> {
    provisioner: Provisioner<B>,
    settings: BrokerSettings,
}

impl<B: BrokerBackend> ProvisionedBroker<B> {
    /// Create with default settings
    pub fn new(backend: Arc<B>) -> Self {
        Self::with_settings(backend, BrokerSettings::default())
    }

    /// Create with explicit settings
    pub fn with_settings(backend: Arc<B>, settings: BrokerSettings) -> Self {
        Self {
            provisioner: Provisioner::new(backend).with_timeout(settings.provision_timeout),
            settings,
        }
    }

    /// Provisioner owning the resolved handles
    pub fn provisioner(&self) -> &Provisioner<B> {
        &self.provisioner
    }

    /// Active settings
    pub fn settings(&self) -> BrokerSettings {
        self.settings
    }

    async fn publish(&self, message: OutboundMessage) -> Result<()> {
        let payload = message.encode()?;
        let topic_name = message.topic();
        let topic = self.provisioner.resolve_topic(topic_name).await?;

        let timeout = self.settings.publish_timeout;
        let submit = self.provisioner.backend().publish(&topic, payload);
        match tokio::time::timeout(timeout, submit).await {
            Ok(Ok(server_id)) => {
                debug!(
                    topic = topic_name,
                    server_id = server_id.as_deref().unwrap_or("-"),
                    "Published message"
                );
                Ok(())
            }
            Ok(Err(source)) => Err(Error::transport_with_source("publish", source)),
            Err(_) => Err(Error::transport(
                "publish",
                format!("no acknowledgment within {timeout:?}"),
            )),
        }
    }

    async fn listen(
        &self,
        topic: &str,
        subscription: &str,
        out: &mpsc::Sender<InboundResult>,
    ) -> Result<()> {
        let handle = self
            .provisioner
            .resolve_subscription(subscription, topic)
            .await?;

        let deliveries = self
            .provisioner
            .backend()
            .pull(&handle)
            .await
            .map_err(|source| Error::transport_with_source("listen", source))?;

        info!(
            topic = topic,
            subscription = subscription,
            backend = self.provisioner.backend().name(),
            "Listening for messages"
        );

        let outcome = deliveries
            .map_err(|source| Stop::Failed(Error::transport_with_source("listen", source)))
            .try_for_each_concurrent(self.settings.max_concurrent_deliveries, |delivery| {
                hand_off(out, delivery)
            })
            .await;

        match outcome {
            Ok(()) => Err(Error::transport("listen", "delivery stream ended")),
            Err(Stop::ConsumerGone) => {
                debug!(
                    subscription = subscription,
                    "Output channel closed by consumer"
                );
                Ok(())
            }
            Err(Stop::Failed(error)) => Err(error),
        }
    }
}

/// Push one payload to the channel, then acknowledge it
///
/// A payload that cannot be handed off is left unacknowledged so the broker
/// redelivers it.
async fn hand_off(
    out: &mpsc::Sender<InboundResult>,
    delivery: Delivery,
) -> std::result::Result<(), Stop> {
    let id = delivery.id().map(str::to_owned);
    let (payload, ack) = delivery.into_parts();

    if out.send(Ok(payload)).await.is_err() {
        return Err(Stop::ConsumerGone);
    }
    trace!(message_id = id.as_deref().unwrap_or("-"), "Delivered message");

    if let Err(e) = ack.ack().await {
        warn!(
            message_id = id.as_deref().unwrap_or("-"),
            error = %e,
            "Failed to acknowledge message"
        );
    }
    Ok(())
}

#[async_trait]
impl<B: BrokerBackend> MessageBroker for ProvisionedBroker<B> {
    async fn send(&self, cancel: &CancellationToken, message: OutboundMessage) -> Result<()> {
        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(Error::cancelled("publish")),
            result = self.publish(message) => result,
        }
    }

    async fn receive(
        &self,
        cancel: CancellationToken,
        topic: &str,
        subscription: &str,
        out: mpsc::Sender<InboundResult>,
    ) {
        let outcome = tokio::select! {
            biased;
            () = cancel.cancelled() => Ok(()),
            () = out.closed() => {
                debug!(
                    subscription = subscription,
                    "Output channel closed by consumer"
                );
                Ok(())
            }
            outcome = self.listen(topic, subscription, &out) => outcome,
        };

        if let Err(error) = outcome {
            warn!(
                topic = topic,
                subscription = subscription,
                error = %error,
                "Receive session failed"
            );
            tokio::select! {
                biased;
                () = cancel.cancelled() => {}
                _ = out.send(Err(error)) => {}
            }
        }
        debug!(
            topic = topic,
            subscription = subscription,
            "Receive session closed"
        );
    }

    fn provider_name(&self) -> &'static str {
        self.provisioner.backend().name()
    }
}

impl<B: BrokerBackend> std::fmt::Debug for ProvisionedBroker<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProvisionedBroker")
            .field("provisioner", &self.provisioner)
            .field("settings", &self.settings)
            .finish()
    }
}
