//! Broker configuration types

use crate::constants::DEFAULT_CONNECTION_TIMEOUT_MS;
use msgbus_domain::constants::{
    DEFAULT_ACK_WAIT, DEFAULT_CHANNEL_CAPACITY, DEFAULT_MAX_CONCURRENT_DELIVERIES,
    DEFAULT_PROVISION_TIMEOUT, DEFAULT_PUBLISH_TIMEOUT,
};
use msgbus_providers::constants::NATS_DEFAULT_CLIENT_NAME;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Broker provider types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BrokerProvider {
    /// NATS JetStream - streams and durable consumers on a NATS server
    Nats,
    /// In-process broker - default, no external service
    #[default]
    Memory,
    /// Logs publishes and never delivers
    Null,
}

impl std::fmt::Display for BrokerProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Nats => write!(f, "nats"),
            Self::Memory => write!(f, "memory"),
            Self::Null => write!(f, "null"),
        }
    }
}

/// Broker configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    /// Broker provider to use
    pub provider: BrokerProvider,

    /// Project namespace for topics and subscriptions
    pub project_id: String,

    /// NATS server URL (for NATS provider)
    /// Example: "nats://localhost:4222"
    pub nats_url: Option<String>,

    /// NATS client name (for NATS provider)
    pub nats_client_name: Option<String>,

    /// Connection timeout in milliseconds
    pub connection_timeout_ms: u64,

    /// Deadline for one publish round trip in milliseconds
    pub publish_timeout_ms: u64,

    /// Deadline for each provisioning call in milliseconds
    pub provision_timeout_ms: u64,

    /// Seconds before an unacknowledged message is redelivered
    pub ack_wait_secs: u64,

    /// Deliveries handed off concurrently within one receive session
    pub max_concurrent_deliveries: usize,

    /// Capacity of channels created for receive sessions
    pub channel_capacity: usize,
}

/// Returns default broker configuration with:
/// - In-memory provider
/// - 20s publish, provisioning and ack deadlines
/// - 10 concurrent deliveries per session
impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            provider: BrokerProvider::Memory,
            project_id: String::new(),
            nats_url: None,
            nats_client_name: Some(NATS_DEFAULT_CLIENT_NAME.to_string()),
            connection_timeout_ms: DEFAULT_CONNECTION_TIMEOUT_MS,
            publish_timeout_ms: DEFAULT_PUBLISH_TIMEOUT.as_secs() * 1000,
            provision_timeout_ms: DEFAULT_PROVISION_TIMEOUT.as_secs() * 1000,
            ack_wait_secs: DEFAULT_ACK_WAIT.as_secs(),
            max_concurrent_deliveries: DEFAULT_MAX_CONCURRENT_DELIVERIES,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl BrokerConfig {
    /// Create config for the in-memory broker (default)
    pub fn memory() -> Self {
        Self::default()
    }

    /// Create config for NATS JetStream
    pub fn nats(url: impl Into<String>, project_id: impl Into<String>) -> Self {
        Self {
            provider: BrokerProvider::Nats,
            nats_url: Some(url.into()),
            project_id: project_id.into(),
            ..Default::default()
        }
    }

    /// Create config for the null broker
    pub fn null() -> Self {
        Self {
            provider: BrokerProvider::Null,
            ..Default::default()
        }
    }

    /// Connection timeout as a duration
    pub fn connection_timeout(&self) -> Duration {
        Duration::from_millis(self.connection_timeout_ms)
    }

    /// Publish deadline as a duration
    pub fn publish_timeout(&self) -> Duration {
        Duration::from_millis(self.publish_timeout_ms)
    }

    /// Provisioning deadline as a duration
    pub fn provision_timeout(&self) -> Duration {
        Duration::from_millis(self.provision_timeout_ms)
    }

    /// Ack wait as a duration
    pub fn ack_wait(&self) -> Duration {
        Duration::from_secs(self.ack_wait_secs)
    }
}
