//! Provider-specific constants

use std::time::Duration;

// ============================================================================
// NATS JetStream
// ============================================================================

/// Default NATS server URL
pub const NATS_DEFAULT_URL: &str = "nats://localhost:4222";

/// Default client name reported to the NATS server
pub const NATS_DEFAULT_CLIENT_NAME: &str = "msgbus";

/// Default deadline for the initial NATS connection
pub const NATS_DEFAULT_CONNECTION_TIMEOUT: Duration = Duration::from_secs(5);

/// Separator between project and topic in JetStream subjects
pub const NATS_SUBJECT_SEPARATOR: char = '.';

/// Separator between project and topic in JetStream stream names
pub const NATS_STREAM_SEPARATOR: char = '-';

/// Prefix of an escaped byte in JetStream names
pub const NATS_ESCAPE_PREFIX: char = '_';

// ============================================================================
// Provider names
// ============================================================================

/// Provider name reported by the null broker
pub const NULL_PROVIDER_NAME: &str = "null";

/// Provider name reported by the in-memory backend
pub const MEMORY_PROVIDER_NAME: &str = "memory";

/// Provider name reported by the JetStream backend
pub const NATS_PROVIDER_NAME: &str = "nats";
