//! # msgbus
//!
//! Broker-agnostic publish/receive over managed publish/subscribe brokers.
//!
//! Topics and subscriptions are created on first use. Received payloads are
//! streamed into a caller-supplied channel that closes exactly once when the
//! session ends.
//!
//! ## Example
//!
//! ```ignore
//! use msgbus::{AppConfig, BrokerConfig, CancellationToken, MessageApiFactory};
//!
//! let mut config = AppConfig::default();
//! config.broker = BrokerConfig::nats("nats://localhost:4222", "acme");
//! let api = MessageApiFactory::create(&config).await?;
//!
//! let cancel = CancellationToken::new();
//! let (mut rx, _session) = api.spawn_receive(cancel.clone(), "orders", "billing", 64);
//! api.publish(&cancel, "orders", &serde_json::json!({"id": 1})).await?;
//! while let Some(result) = rx.recv().await {
//!     println!("{:?}", result?);
//! }
//! ```
//!
//! ## Architecture
//!
//! - `domain` - Errors, value objects and broker ports
//! - `application` - Provisioning, publish and receive paths, `MessageApi`
//! - `providers` - NATS JetStream, in-memory and null brokers
//! - `infrastructure` - Configuration, logging and factories

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::warn;

/// Domain layer - errors, value objects and ports
///
/// Re-exports from the domain crate for convenience
pub mod domain {
    pub use msgbus_domain::*;
}

/// Application layer - provisioner, backend-driven broker and facade
///
/// Re-exports from the application crate for convenience
pub mod application {
    pub use msgbus_application::*;
}

/// Broker implementations
///
/// Re-exports from the providers crate for convenience
pub mod providers {
    pub use msgbus_providers::*;
}

/// Infrastructure layer - configuration, logging and factories
///
/// Re-exports from the infrastructure crate for convenience
pub mod infrastructure {
    pub use msgbus_infrastructure::*;
}

// Re-export commonly used types at the crate root
pub use domain::{Error, ErrorKind, InboundResult, MessageBroker, OutboundMessage, Result};
pub use application::MessageApi;
pub use infrastructure::{
    AppConfig, BrokerConfig, BrokerProvider, ConfigLoader, LoggingConfig, MessageApiFactory,
};
pub use tokio_util::sync::CancellationToken;

/// Build a broker from `config` and publish `message` to `topic` once
///
/// # Errors
///
/// Construction errors from [`MessageApiFactory::create`], then the errors
/// of [`MessageApi::publish`].
pub async fn publish_message<T: Serialize + ?Sized>(
    config: &AppConfig,
    topic: &str,
    message: &T,
) -> Result<()> {
    let api = MessageApiFactory::create(config).await?;
    api.publish(&CancellationToken::new(), topic, message).await
}

/// Build a broker from `config` and stream `subscription` on `topic` into `out`
///
/// A construction failure is pushed as the single error result; either way
/// the channel closes when this returns.
pub async fn receive_message(
    config: &AppConfig,
    cancel: CancellationToken,
    topic: &str,
    subscription: &str,
    out: mpsc::Sender<InboundResult>,
) {
    match MessageApiFactory::create(config).await {
        Ok(api) => api.receive(cancel, topic, subscription, out).await,
        Err(error) => {
            warn!(topic = topic, subscription = subscription, error = %error, "Could not create broker");
            let _ = out.send(Err(error)).await;
        }
    }
}

/// Build a broker from `config` and run a receive session on its own task
///
/// The channel holds `config.broker.channel_capacity` results.
///
/// # Errors
///
/// Construction errors from [`MessageApiFactory::create`].
pub async fn subscribe(
    config: &AppConfig,
    cancel: CancellationToken,
    topic: &str,
    subscription: &str,
) -> Result<(mpsc::Receiver<InboundResult>, JoinHandle<()>)> {
    let api = MessageApiFactory::create(config).await?;
    Ok(api.spawn_receive(
        cancel,
        topic,
        subscription,
        config.broker.channel_capacity,
    ))
}
