//! Resource Provisioner
//!
//! Ensures a topic (and, for receive, a subscription bound to it) exists on
//! the remote broker before use. The first use of a name checks existence,
//! creates the resource if missing and caches the handle; later uses reuse it.
//!
//! ## Single resolution
//!
//! Each name maps to one `OnceCell`. Concurrent first callers for the same
//! name await the same cell, so only one check-and-create runs against the
//! broker. A failed resolution leaves the cell empty and the next caller
//! retries from scratch.

use dashmap::DashMap;
use msgbus_domain::constants::DEFAULT_PROVISION_TIMEOUT;
use msgbus_domain::error::{Error, ProvisionStep, Result};
use msgbus_domain::ports::{BackendResult, BrokerBackend};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info};

type Slot<T> = Arc<OnceCell<T>>;

/// Get-or-create cache of topic and subscription handles
pub struct Provisioner<B: BrokerBackend> {
    backend: Arc<B>,
    timeout: Duration,
    topics: DashMap<String, Slot<B::Topic>>,
    /// Keyed by (topic, subscription): the same subscription name may exist
    /// under different topics on brokers that scope consumers per topic.
    subscriptions: DashMap<(String, String), Slot<B::Subscription>>,
}

impl<B: BrokerBackend> Provisioner<B> {
    /// Create a provisioner with the default per-call deadline
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            timeout: DEFAULT_PROVISION_TIMEOUT,
            topics: DashMap::new(),
            subscriptions: DashMap::new(),
        }
    }

    /// Bound each existence check and create call by `timeout`
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Backend this provisioner talks to
    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    /// Resolve `name` to a topic handle, creating the topic if it is missing
    ///
    /// # Errors
    ///
    /// Returns [`Error::Provisioning`] naming the failed step (check or create).
    pub async fn resolve_topic(&self, name: &str) -> Result<B::Topic> {
        let slot = Arc::clone(&self.topics.entry(name.to_owned()).or_default());
        let topic = slot
            .get_or_try_init(|| self.find_or_create_topic(name))
            .await?;
        Ok(topic.clone())
    }

    /// Resolve subscription `name` bound to `topic_name`
    ///
    /// The topic is resolved (and created if needed) first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Provisioning`] for any failed topic or subscription step.
    pub async fn resolve_subscription(
        &self,
        name: &str,
        topic_name: &str,
    ) -> Result<B::Subscription> {
        let topic = self.resolve_topic(topic_name).await?;
        let key = (topic_name.to_owned(), name.to_owned());
        let slot = Arc::clone(&self.subscriptions.entry(key).or_default());
        let subscription = slot
            .get_or_try_init(|| self.find_or_create_subscription(&topic, topic_name, name))
            .await?;
        Ok(subscription.clone())
    }

    /// Number of topics resolved so far
    pub fn cached_topics(&self) -> usize {
        self.topics
            .iter()
            .filter(|entry| entry.value().initialized())
            .count()
    }

    /// Number of subscriptions resolved so far
    pub fn cached_subscriptions(&self) -> usize {
        self.subscriptions
            .iter()
            .filter(|entry| entry.value().initialized())
            .count()
    }

    async fn find_or_create_topic(&self, name: &str) -> Result<B::Topic> {
        let found = self
            .bounded(ProvisionStep::CheckTopic, name, self.backend.find_topic(name))
            .await?;
        if let Some(topic) = found {
            debug!(topic = name, backend = self.backend.name(), "Topic exists");
            return Ok(topic);
        }

        let topic = self
            .bounded(ProvisionStep::CreateTopic, name, self.backend.create_topic(name))
            .await?;
        info!(topic = name, backend = self.backend.name(), "Created topic");
        Ok(topic)
    }

    async fn find_or_create_subscription(
        &self,
        topic: &B::Topic,
        topic_name: &str,
        name: &str,
    ) -> Result<B::Subscription> {
        let found = self
            .bounded(
                ProvisionStep::CheckSubscription,
                name,
                self.backend.find_subscription(topic, name),
            )
            .await?;
        if let Some(subscription) = found {
            debug!(
                topic = topic_name,
                subscription = name,
                "Subscription exists"
            );
            return Ok(subscription);
        }

        let subscription = self
            .bounded(
                ProvisionStep::CreateSubscription,
                name,
                self.backend.create_subscription(topic, name),
            )
            .await?;
        info!(
            topic = topic_name,
            subscription = name,
            backend = self.backend.name(),
            "Created subscription"
        );
        Ok(subscription)
    }

    async fn bounded<T>(
        &self,
        step: ProvisionStep,
        resource: &str,
        call: impl Future<Output = BackendResult<T>>,
    ) -> Result<T> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(source)) => Err(Error::provisioning(step, resource, Some(source))),
            Err(elapsed) => Err(Error::provisioning(step, resource, Some(Box::new(elapsed)))),
        }
    }
}

impl<B: BrokerBackend> std::fmt::Debug for Provisioner<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Provisioner")
            .field("backend", &self.backend.name())
            .field("timeout", &self.timeout)
            .field("topics", &self.cached_topics())
            .field("subscriptions", &self.cached_subscriptions())
            .finish()
    }
}
