//! Broker Factory
//!
//! Selects the broker implementation named by [`BrokerConfig::provider`]
//! at construction time.

use std::sync::Arc;

use msgbus_application::{BrokerSettings, MessageApi};
use msgbus_domain::error::Result;
use msgbus_domain::ports::MessageBroker;
use tracing::info;

// Provider implementations from msgbus-providers
use msgbus_providers::broker::{InMemoryBackend, InMemoryBroker, NullBroker};
#[cfg(feature = "broker-nats")]
use msgbus_providers::broker::{JetStreamBackend, NatsBroker, NatsSettings};

use crate::config::loader::{validate_app_config, validate_broker_config};
use crate::config::{AppConfig, BrokerConfig, BrokerProvider};

/// Factory for creating brokers
#[derive(Debug)]
pub struct BrokerFactory;

impl BrokerFactory {
    /// Create a broker based on configuration
    ///
    /// # Errors
    ///
    /// - [`Error::Configuration`](msgbus_domain::Error::Configuration) for an
    ///   invalid configuration or a provider compiled out of this build
    /// - [`Error::Transport`](msgbus_domain::Error::Transport) when a
    ///   networked broker cannot be reached
    pub async fn create(config: &BrokerConfig) -> Result<Arc<dyn MessageBroker>> {
        validate_broker_config(config)?;

        let broker: Arc<dyn MessageBroker> = match config.provider {
            BrokerProvider::Memory => Arc::new(InMemoryBroker::with_settings(
                InMemoryBackend::new_shared(),
                Self::settings(config),
            )),
            BrokerProvider::Null => NullBroker::new_shared(),
            BrokerProvider::Nats => Self::create_nats(config).await?,
        };

        info!(provider = broker.provider_name(), "Broker created");
        Ok(broker)
    }

    /// Tuning shared by every backend-driven broker
    pub fn settings(config: &BrokerConfig) -> BrokerSettings {
        BrokerSettings {
            publish_timeout: config.publish_timeout(),
            provision_timeout: config.provision_timeout(),
            max_concurrent_deliveries: config.max_concurrent_deliveries,
        }
    }

    #[cfg(feature = "broker-nats")]
    async fn create_nats(config: &BrokerConfig) -> Result<Arc<dyn MessageBroker>> {
        let mut settings = NatsSettings::new(
            config.nats_url.clone().unwrap_or_default(),
            config.project_id.clone(),
        );
        if let Some(name) = &config.nats_client_name {
            settings.client_name.clone_from(name);
        }
        settings.connection_timeout = config.connection_timeout();
        settings.ack_wait = config.ack_wait();

        let backend = JetStreamBackend::connect(&settings).await?;
        Ok(Arc::new(NatsBroker::with_settings(
            Arc::new(backend),
            Self::settings(config),
        )))
    }

    #[cfg(not(feature = "broker-nats"))]
    async fn create_nats(_config: &BrokerConfig) -> Result<Arc<dyn MessageBroker>> {
        Err(msgbus_domain::Error::configuration(
            "nats provider requires the broker-nats feature",
        ))
    }
}

/// Factory for creating the message facade
#[derive(Debug)]
pub struct MessageApiFactory;

impl MessageApiFactory {
    /// Create a [`MessageApi`] over the broker named by `config`
    ///
    /// # Errors
    ///
    /// Same as [`BrokerFactory::create`], plus logging validation failures.
    pub async fn create(config: &AppConfig) -> Result<MessageApi> {
        validate_app_config(config)?;
        let broker = BrokerFactory::create(&config.broker).await?;
        Ok(MessageApi::new(broker))
    }
}
