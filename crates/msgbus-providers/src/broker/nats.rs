//! NATS JetStream Broker Backend
//!
//! Maps broker resources onto JetStream:
//!
//! | Resource | JetStream |
//! |----------|-----------|
//! | Topic `orders` | Stream `{project}-orders` bound to subject `{project}.orders` |
//! | Subscription `billing` | Durable pull consumer `billing` on that stream |
//!
//! The project id namespaces every stream and subject so several projects can
//! share one NATS deployment. Consumers use explicit acks; a message that is
//! not acked within `ack_wait` is redelivered by the server.
//!
//! Names are escaped before use: ASCII letters and digits pass through, every
//! other byte becomes `_XX` (uppercase hex). The escape never produces `-` or
//! `.`, so distinct topic names always map to distinct streams and subjects.
//!
//! ## Example
//!
//! ```ignore
//! use msgbus_providers::broker::{JetStreamBackend, NatsBroker, NatsSettings};
//!
//! let settings = NatsSettings::new("nats://localhost:4222", "acme");
//! let backend = JetStreamBackend::connect(&settings).await?;
//! let broker = NatsBroker::new(std::sync::Arc::new(backend));
//! ```

use async_nats::jetstream::consumer::pull::{MessagesError, MessagesErrorKind};
use async_nats::jetstream::{self, consumer, context, stream};
use async_trait::async_trait;
use futures::{Stream, StreamExt, future};
use msgbus_domain::constants::{DEFAULT_ACK_WAIT, PROJECT_ID_REQUIRED};
use msgbus_domain::error::{BoxError, Error, Result};
use msgbus_domain::ports::{Acknowledger, BackendResult, BrokerBackend, Delivery, DeliveryStream};
use std::fmt::Write as _;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

use crate::constants::{
    NATS_DEFAULT_CLIENT_NAME, NATS_DEFAULT_CONNECTION_TIMEOUT, NATS_DEFAULT_URL, NATS_ESCAPE_PREFIX,
    NATS_PROVIDER_NAME, NATS_STREAM_SEPARATOR, NATS_SUBJECT_SEPARATOR,
};

/// Connection settings for [`JetStreamBackend`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NatsSettings {
    /// Server URL
    pub url: String,
    /// Namespace for streams and subjects
    pub project_id: String,
    /// Name reported to the server
    pub client_name: String,
    /// Deadline for the initial connection
    pub connection_timeout: Duration,
    /// Redelivery delay for unacknowledged messages
    pub ack_wait: Duration,
}

impl NatsSettings {
    /// Settings for `url` and `project_id` with defaults for the rest
    pub fn new(url: impl Into<String>, project_id: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            project_id: project_id.into(),
            ..Self::default()
        }
    }
}

impl Default for NatsSettings {
    fn default() -> Self {
        Self {
            url: NATS_DEFAULT_URL.to_string(),
            project_id: String::new(),
            client_name: NATS_DEFAULT_CLIENT_NAME.to_string(),
            connection_timeout: NATS_DEFAULT_CONNECTION_TIMEOUT,
            ack_wait: DEFAULT_ACK_WAIT,
        }
    }
}

/// Resolved topic: a stream and the subject it captures
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JetStreamTopic {
    stream_name: String,
    subject: String,
}

impl JetStreamTopic {
    /// Stream holding the topic's messages
    pub fn stream_name(&self) -> &str {
        &self.stream_name
    }

    /// Subject messages are published to
    pub fn subject(&self) -> &str {
        &self.subject
    }
}

/// Resolved subscription: a durable consumer on the topic's stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JetStreamSubscription {
    stream_name: String,
    consumer_name: String,
}

impl JetStreamSubscription {
    /// Durable consumer name
    pub fn consumer_name(&self) -> &str {
        &self.consumer_name
    }
}

/// [`BrokerBackend`] over NATS JetStream
pub struct JetStreamBackend {
    context: jetstream::Context,
    project_id: String,
    ack_wait: Duration,
}

impl JetStreamBackend {
    /// Connect to the server described by `settings`
    ///
    /// # Errors
    ///
    /// - [`Error::Configuration`] when the project id is blank
    /// - [`Error::Transport`] when the server cannot be reached
    pub async fn connect(settings: &NatsSettings) -> Result<Self> {
        if settings.project_id.trim().is_empty() {
            return Err(Error::configuration(PROJECT_ID_REQUIRED));
        }

        info!("Connecting to NATS server at {}", settings.url);
        let client = async_nats::ConnectOptions::new()
            .name(&settings.client_name)
            .connection_timeout(settings.connection_timeout)
            .connect(settings.url.as_str())
            .await
            .map_err(|e| Error::transport_with_source("connect", Box::new(e)))?;
        info!(
            project = settings.project_id.as_str(),
            "Connected to NATS server at {}", settings.url
        );

        Ok(Self::with_context(
            jetstream::new(client),
            &settings.project_id,
            settings.ack_wait,
        ))
    }

    /// Build over an existing JetStream context
    pub fn with_context(context: jetstream::Context, project_id: &str, ack_wait: Duration) -> Self {
        Self {
            context,
            project_id: project_id.to_string(),
            ack_wait,
        }
    }

    /// Project namespace
    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    fn topic_handle(&self, name: &str) -> JetStreamTopic {
        JetStreamTopic {
            stream_name: stream_name(&self.project_id, name),
            subject: subject(&self.project_id, name),
        }
    }
}

impl std::fmt::Debug for JetStreamBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JetStreamBackend")
            .field("project_id", &self.project_id)
            .field("ack_wait", &self.ack_wait)
            .finish()
    }
}

/// Escape `raw` into a stream, consumer and subject token
///
/// Reversible: letters and digits are kept, any other byte is written as
/// `_XX`.
fn escape(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        if byte.is_ascii_alphanumeric() {
            escaped.push(char::from(byte));
        } else {
            let _ = write!(escaped, "{NATS_ESCAPE_PREFIX}{byte:02X}");
        }
    }
    escaped
}

/// Stream name for `topic` under `project`
fn stream_name(project: &str, topic: &str) -> String {
    format!(
        "{}{}{}",
        escape(project),
        NATS_STREAM_SEPARATOR,
        escape(topic)
    )
}

/// Subject for `topic` under `project`
fn subject(project: &str, topic: &str) -> String {
    format!(
        "{}{}{}",
        escape(project),
        NATS_SUBJECT_SEPARATOR,
        escape(topic)
    )
}

/// Acknowledgment for one JetStream message
struct NatsAck(jetstream::Message);

#[async_trait]
impl Acknowledger for NatsAck {
    async fn ack(self: Box<Self>) -> BackendResult<()> {
        self.0.ack().await
    }
}

fn into_delivery(message: jetstream::Message) -> Delivery {
    let id = match message.info() {
        Ok(info) => Some(info.stream_sequence.to_string()),
        Err(e) => {
            trace!(error = %e, "Message metadata unreadable, delivering without id");
            None
        }
    };
    let payload = message.payload.to_vec();
    let delivery = Delivery::new(payload, Box::new(NatsAck(message)));
    match id {
        Some(id) => delivery.with_id(id),
        None => delivery,
    }
}

/// Pull errors after which the message stream keeps going
fn is_transient(kind: MessagesErrorKind) -> bool {
    matches!(
        kind,
        MessagesErrorKind::MissingHeartbeat | MessagesErrorKind::Pull
    )
}

/// Drop transient pull errors so only fatal ones end a listening session
fn skip_transient<T, S>(messages: S) -> impl Stream<Item = std::result::Result<T, MessagesError>>
where
    S: Stream<Item = std::result::Result<T, MessagesError>>,
{
    messages.filter(|item| {
        let keep = match item {
            Err(e) if is_transient(e.kind()) => {
                warn!(error = %e, "Transient pull error, still listening");
                false
            }
            _ => true,
        };
        future::ready(keep)
    })
}

#[async_trait]
impl BrokerBackend for JetStreamBackend {
    type Topic = JetStreamTopic;
    type Subscription = JetStreamSubscription;

    async fn find_topic(&self, name: &str) -> BackendResult<Option<Self::Topic>> {
        let topic = self.topic_handle(name);
        match self.context.get_stream(&topic.stream_name).await {
            Ok(_) => Ok(Some(topic)),
            Err(e) => match e.kind() {
                context::GetStreamErrorKind::JetStream(err)
                    if err.error_code() == jetstream::ErrorCode::STREAM_NOT_FOUND =>
                {
                    Ok(None)
                }
                _ => Err(Box::new(e)),
            },
        }
    }

    async fn create_topic(&self, name: &str) -> BackendResult<Self::Topic> {
        let topic = self.topic_handle(name);
        self.context
            .create_stream(stream::Config {
                name: topic.stream_name.clone(),
                subjects: vec![topic.subject.clone()],
                retention: stream::RetentionPolicy::Interest,
                ..Default::default()
            })
            .await?;
        debug!(
            stream = topic.stream_name.as_str(),
            subject = topic.subject.as_str(),
            "Created JetStream stream"
        );
        Ok(topic)
    }

    async fn find_subscription(
        &self,
        topic: &Self::Topic,
        name: &str,
    ) -> BackendResult<Option<Self::Subscription>> {
        let consumer_name = escape(name);
        let lookup = self
            .context
            .get_consumer_from_stream::<consumer::pull::Config, _, _>(
                consumer_name.as_str(),
                topic.stream_name.as_str(),
            )
            .await;
        match lookup {
            Ok(_) => Ok(Some(JetStreamSubscription {
                stream_name: topic.stream_name.clone(),
                consumer_name,
            })),
            Err(e) => match e.kind() {
                stream::ConsumerErrorKind::JetStream(err)
                    if err.error_code() == jetstream::ErrorCode::CONSUMER_NOT_FOUND =>
                {
                    Ok(None)
                }
                _ => Err(Box::new(e)),
            },
        }
    }

    async fn create_subscription(
        &self,
        topic: &Self::Topic,
        name: &str,
    ) -> BackendResult<Self::Subscription> {
        let consumer_name = escape(name);
        self.context
            .create_consumer_on_stream(
                consumer::pull::Config {
                    durable_name: Some(consumer_name.clone()),
                    ack_policy: consumer::AckPolicy::Explicit,
                    ack_wait: self.ack_wait,
                    ..Default::default()
                },
                topic.stream_name.as_str(),
            )
            .await?;
        Ok(JetStreamSubscription {
            stream_name: topic.stream_name.clone(),
            consumer_name,
        })
    }

    async fn publish(&self, topic: &Self::Topic, payload: Vec<u8>) -> BackendResult<Option<String>> {
        let ack = self
            .context
            .publish(topic.subject.clone(), payload.into())
            .await?
            .await?;
        Ok(Some(ack.sequence.to_string()))
    }

    async fn pull(&self, subscription: &Self::Subscription) -> BackendResult<DeliveryStream> {
        let consumer = self
            .context
            .get_consumer_from_stream::<consumer::pull::Config, _, _>(
                subscription.consumer_name.as_str(),
                subscription.stream_name.as_str(),
            )
            .await?;
        let messages = consumer.messages().await?;
        let deliveries = skip_transient(messages)
            .map(|item| item.map(into_delivery).map_err(BoxError::from));
        Ok(Box::pin(deliveries))
    }

    fn name(&self) -> &'static str {
        NATS_PROVIDER_NAME
    }
}
