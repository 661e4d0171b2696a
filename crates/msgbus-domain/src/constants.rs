//! Domain layer constants
//!
//! Deadlines and fixed messages that define the messaging contract.
//! Infrastructure-specific defaults (config file names, env prefixes) live in
//! `msgbus_infrastructure::constants`.

use std::time::Duration;

// ============================================================================
// DEADLINES
// ============================================================================

/// Bound on a single publish round trip, independent of caller cancellation
pub const DEFAULT_PUBLISH_TIMEOUT: Duration = Duration::from_secs(20);

/// Bound on each existence check or create call against the broker
pub const DEFAULT_PROVISION_TIMEOUT: Duration = Duration::from_secs(20);

/// Time the broker waits for an ack before redelivering a message
pub const DEFAULT_ACK_WAIT: Duration = Duration::from_secs(20);

// ============================================================================
// RECEIVE SESSION
// ============================================================================

/// Deliveries handed to the output channel concurrently within one session
pub const DEFAULT_MAX_CONCURRENT_DELIVERIES: usize = 10;

/// Suggested capacity for the caller's output channel
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

// ============================================================================
// VALIDATION MESSAGES
// ============================================================================

/// Returned when publish is called with an empty topic or a null message
pub const TOPIC_AND_MESSAGE_REQUIRED: &str = "topic and message are required";

/// Pushed when receive is called with an empty topic or subscription
pub const TOPIC_AND_SUBSCRIPTION_REQUIRED: &str = "topic and subscription are required";

/// Returned when a broker requiring a project identifier is given a blank one
pub const PROJECT_ID_REQUIRED: &str = "project id can not be blank";
