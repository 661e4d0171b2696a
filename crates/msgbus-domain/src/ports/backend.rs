//! Broker Backend Port
//!
//! The narrow remote API a concrete broker exposes: existence checks,
//! resource creation, publishing and pulling deliveries. The provisioner and
//! the backend-driven broker in `msgbus-application` are written against this
//! trait, so any backend gets get-or-create provisioning and the streaming
//! receive protocol for free.

use crate::error::BoxError;
use async_trait::async_trait;
use futures::Stream;
use std::fmt;
use std::pin::Pin;

/// Result of a raw backend call; the cause is wrapped by the caller
pub type BackendResult<T> = std::result::Result<T, BoxError>;

/// Boxed stream of deliveries for one listening session
///
/// An `Err` item is a fatal listening error. The stream ending means the
/// broker closed the session.
pub type DeliveryStream = Pin<Box<dyn Stream<Item = BackendResult<Delivery>> + Send + 'static>>;

/// Per-message acknowledgment capability
#[async_trait]
pub trait Acknowledger: Send {
    /// Tell the broker the message was processed and must not be redelivered
    async fn ack(self: Box<Self>) -> BackendResult<()>;
}

/// Acknowledgment owed for exactly one delivery
///
/// Consumed by [`AckHandle::ack`]. Dropping it without acking leaves the
/// message to the broker's redelivery.
pub struct AckHandle {
    inner: Box<dyn Acknowledger>,
}

impl AckHandle {
    /// Wrap a backend acknowledger
    pub fn new(inner: Box<dyn Acknowledger>) -> Self {
        Self { inner }
    }

    /// Acknowledge the delivery this handle belongs to
    pub async fn ack(self) -> BackendResult<()> {
        self.inner.ack().await
    }
}

impl fmt::Debug for AckHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AckHandle").finish_non_exhaustive()
    }
}

/// One message delivered by the broker
#[derive(Debug)]
pub struct Delivery {
    id: Option<String>,
    payload: Vec<u8>,
    ack: AckHandle,
}

impl Delivery {
    /// Create a delivery owning its acknowledger
    pub fn new(payload: Vec<u8>, acker: Box<dyn Acknowledger>) -> Self {
        Self {
            id: None,
            payload,
            ack: AckHandle::new(acker),
        }
    }

    /// Attach the broker-assigned message id
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Broker-assigned message id, when the backend provides one
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Raw payload bytes
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Separate the payload from its pending acknowledgment
    pub fn into_parts(self) -> (Vec<u8>, AckHandle) {
        (self.payload, self.ack)
    }
}

/// Remote broker API used for provisioning, publishing and pulling
///
/// `Topic` and `Subscription` are the backend's resolved handles. They are
/// cloned out of the provisioner cache on every operation, so they should be
/// cheap to clone.
#[async_trait]
pub trait BrokerBackend: Send + Sync + 'static {
    /// Resolved topic handle
    type Topic: Clone + Send + Sync + 'static;
    /// Resolved subscription handle
    type Subscription: Clone + Send + Sync + 'static;

    /// Look up a topic; `Ok(None)` when it does not exist
    async fn find_topic(&self, name: &str) -> BackendResult<Option<Self::Topic>>;

    /// Create a topic that was reported missing
    async fn create_topic(&self, name: &str) -> BackendResult<Self::Topic>;

    /// Look up a subscription bound to `topic`; `Ok(None)` when it does not exist
    async fn find_subscription(
        &self,
        topic: &Self::Topic,
        name: &str,
    ) -> BackendResult<Option<Self::Subscription>>;

    /// Create a subscription bound to `topic`
    async fn create_subscription(
        &self,
        topic: &Self::Topic,
        name: &str,
    ) -> BackendResult<Self::Subscription>;

    /// Submit a payload and wait for the broker's acknowledgment
    ///
    /// Returns the server-assigned message id when the broker reports one.
    async fn publish(&self, topic: &Self::Topic, payload: Vec<u8>) -> BackendResult<Option<String>>;

    /// Open a listening session on `subscription`
    async fn pull(&self, subscription: &Self::Subscription) -> BackendResult<DeliveryStream>;

    /// Short backend name for logs
    fn name(&self) -> &'static str;
}
