//! In-Memory Broker Backend
//!
//! Backend that keeps topics and subscriptions in process memory.
//!
//! ## Features
//!
//! - Topics fan out each published message to every bound subscription
//! - Messages published before a subscription exists are not delivered to it
//! - One listening session per subscription at a time; a second session
//!   waits until the first one ends
//! - A delivery dropped without ack is requeued (at-least-once)
//! - No persistence (state is lost with the process)
//!
//! ## Example
//!
//! ```ignore
//! use msgbus_providers::broker::{InMemoryBackend, InMemoryBroker};
//!
//! let broker = InMemoryBroker::new(InMemoryBackend::new_shared());
//! ```

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::stream;
use msgbus_domain::ports::{
    Acknowledger, BackendResult, BrokerBackend, Delivery, DeliveryStream,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, trace};

use crate::constants::MEMORY_PROVIDER_NAME;

/// Message waiting in a subscription queue
#[derive(Debug, Clone)]
struct Envelope {
    id: u64,
    payload: Vec<u8>,
    attempt: u32,
}

/// Topic held by the in-memory backend
#[derive(Debug)]
pub struct MemoryTopic {
    name: String,
    subscriptions: DashMap<String, Arc<MemorySubscription>>,
}

impl MemoryTopic {
    /// Topic name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of subscriptions bound to this topic
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }
}

/// Subscription queue held by the in-memory backend
#[derive(Debug)]
pub struct MemorySubscription {
    name: String,
    sender: mpsc::UnboundedSender<Envelope>,
    receiver: Arc<Mutex<mpsc::UnboundedReceiver<Envelope>>>,
}

impl MemorySubscription {
    fn new(name: &str) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            name: name.to_string(),
            sender,
            receiver: Arc::new(Mutex::new(receiver)),
        }
    }

    /// Subscription name
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Activity counters
#[derive(Debug, Default)]
struct Counters {
    topics_created: AtomicUsize,
    subscriptions_created: AtomicUsize,
    published: AtomicUsize,
    acknowledged: AtomicUsize,
    redelivered: AtomicUsize,
}

/// In-process [`BrokerBackend`]
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    topics: DashMap<String, Arc<MemoryTopic>>,
    next_id: AtomicU64,
    counters: Arc<Counters>,
}

impl InMemoryBackend {
    /// Create an empty backend
    pub fn new() -> Self {
        Self::default()
    }

    /// Create as Arc for sharing
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Number of topics created so far
    pub fn topics_created(&self) -> usize {
        self.counters.topics_created.load(Ordering::SeqCst)
    }

    /// Number of subscriptions created so far
    pub fn subscriptions_created(&self) -> usize {
        self.counters.subscriptions_created.load(Ordering::SeqCst)
    }

    /// Number of messages accepted by publish
    pub fn published(&self) -> usize {
        self.counters.published.load(Ordering::SeqCst)
    }

    /// Number of deliveries acknowledged
    pub fn acknowledged(&self) -> usize {
        self.counters.acknowledged.load(Ordering::SeqCst)
    }

    /// Number of deliveries requeued after being dropped without ack
    pub fn redelivered(&self) -> usize {
        self.counters.redelivered.load(Ordering::SeqCst)
    }
}

/// Acknowledgment for one in-memory delivery
///
/// Requeues the message when dropped without [`Acknowledger::ack`].
struct MemoryAck {
    envelope: Option<Envelope>,
    requeue: mpsc::UnboundedSender<Envelope>,
    counters: Arc<Counters>,
}

#[async_trait]
impl Acknowledger for MemoryAck {
    async fn ack(mut self: Box<Self>) -> BackendResult<()> {
        if let Some(envelope) = self.envelope.take() {
            trace!(message_id = envelope.id, "Acknowledged message");
            self.counters.acknowledged.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

impl Drop for MemoryAck {
    fn drop(&mut self) {
        if let Some(mut envelope) = self.envelope.take() {
            envelope.attempt += 1;
            debug!(
                message_id = envelope.id,
                attempt = envelope.attempt,
                "Requeueing unacknowledged message"
            );
            self.counters.redelivered.fetch_add(1, Ordering::SeqCst);
            let _ = self.requeue.send(envelope);
        }
    }
}

#[async_trait]
impl BrokerBackend for InMemoryBackend {
    type Topic = Arc<MemoryTopic>;
    type Subscription = Arc<MemorySubscription>;

    async fn find_topic(&self, name: &str) -> BackendResult<Option<Self::Topic>> {
        Ok(self.topics.get(name).map(|topic| Arc::clone(topic.value())))
    }

    async fn create_topic(&self, name: &str) -> BackendResult<Self::Topic> {
        let topic = match self.topics.entry(name.to_string()) {
            Entry::Occupied(existing) => Arc::clone(existing.get()),
            Entry::Vacant(slot) => {
                self.counters.topics_created.fetch_add(1, Ordering::SeqCst);
                let topic = Arc::new(MemoryTopic {
                    name: name.to_string(),
                    subscriptions: DashMap::new(),
                });
                Arc::clone(slot.insert(topic).value())
            }
        };
        Ok(topic)
    }

    async fn find_subscription(
        &self,
        topic: &Self::Topic,
        name: &str,
    ) -> BackendResult<Option<Self::Subscription>> {
        Ok(topic
            .subscriptions
            .get(name)
            .map(|subscription| Arc::clone(subscription.value())))
    }

    async fn create_subscription(
        &self,
        topic: &Self::Topic,
        name: &str,
    ) -> BackendResult<Self::Subscription> {
        let subscription = match topic.subscriptions.entry(name.to_string()) {
            Entry::Occupied(existing) => Arc::clone(existing.get()),
            Entry::Vacant(slot) => {
                self.counters
                    .subscriptions_created
                    .fetch_add(1, Ordering::SeqCst);
                let subscription = Arc::new(MemorySubscription::new(name));
                Arc::clone(slot.insert(subscription).value())
            }
        };
        Ok(subscription)
    }

    async fn publish(&self, topic: &Self::Topic, payload: Vec<u8>) -> BackendResult<Option<String>> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        for subscription in &topic.subscriptions {
            let envelope = Envelope {
                id,
                payload: payload.clone(),
                attempt: 0,
            };
            if subscription.sender.send(envelope).is_err() {
                return Err(format!("subscription '{}' is closed", subscription.name).into());
            }
        }
        self.counters.published.fetch_add(1, Ordering::SeqCst);
        trace!(topic = topic.name(), message_id = id, "Published message");
        Ok(Some(id.to_string()))
    }

    async fn pull(&self, subscription: &Self::Subscription) -> BackendResult<DeliveryStream> {
        let receiver = Arc::clone(&subscription.receiver).lock_owned().await;
        let requeue = subscription.sender.clone();
        let counters = Arc::clone(&self.counters);

        let deliveries = stream::unfold(receiver, move |mut receiver| {
            let requeue = requeue.clone();
            let counters = Arc::clone(&counters);
            async move {
                let envelope = receiver.recv().await?;
                let ack = MemoryAck {
                    envelope: Some(envelope.clone()),
                    requeue,
                    counters,
                };
                let delivery = Delivery::new(envelope.payload, Box::new(ack))
                    .with_id(envelope.id.to_string());
                Some((Ok(delivery), receiver))
            }
        });
        Ok(Box::pin(deliveries))
    }

    fn name(&self) -> &'static str {
        MEMORY_PROVIDER_NAME
    }
}
