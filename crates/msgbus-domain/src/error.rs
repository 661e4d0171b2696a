//! Error handling types

use std::fmt;
use thiserror::Error;

/// Result type alias for operations that can fail
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed cause carried by wrapped errors
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Provisioning step that failed
///
/// Lets callers tell "couldn't check" apart from "couldn't create" without
/// inspecting message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProvisionStep {
    /// Existence check of a topic
    CheckTopic,
    /// Creation of a missing topic
    CreateTopic,
    /// Existence check of a subscription
    CheckSubscription,
    /// Creation of a missing subscription
    CreateSubscription,
}

impl ProvisionStep {
    /// Whether this step is an existence check (as opposed to a create)
    pub fn is_check(self) -> bool {
        matches!(self, Self::CheckTopic | Self::CheckSubscription)
    }
}

impl fmt::Display for ProvisionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::CheckTopic => "check topic",
            Self::CreateTopic => "create topic",
            Self::CheckSubscription => "check subscription",
            Self::CreateSubscription => "create subscription",
        };
        f.write_str(label)
    }
}

/// Closed classification of [`Error`] variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad caller input
    Validation,
    /// Existence check or resource creation failed
    Provisioning,
    /// Message could not be encoded
    Serialization,
    /// Publish, acknowledgment or listening session failed
    Transport,
    /// Caller cancelled the operation
    Cancelled,
    /// Invalid or missing configuration
    Configuration,
}

/// Main error type for msgbus
#[derive(Error, Debug)]
pub enum Error {
    /// Caller input rejected before any broker interaction
    #[error("Validation error: {message}")]
    Validation {
        /// Description of the rejected input
        message: String,
    },

    /// Existence check or create call against the broker failed
    #[error("Provisioning error: could not {step} '{resource}'")]
    Provisioning {
        /// Step that failed
        step: ProvisionStep,
        /// Topic or subscription name
        resource: String,
        /// Optional source error
        #[source]
        source: Option<BoxError>,
    },

    /// Message could not be encoded to the wire format
    #[error("Serialization error: {message}")]
    Serialization {
        /// Description of the encoding failure
        message: String,
        /// Optional source error
        #[source]
        source: Option<BoxError>,
    },

    /// Broker round trip or listening session failed
    #[error("Transport error: {operation}: {message}")]
    Transport {
        /// Operation that failed (publish, listen, ...)
        operation: String,
        /// Description of the failure
        message: String,
        /// Optional source error
        #[source]
        source: Option<BoxError>,
    },

    /// Operation stopped because the caller cancelled it
    #[error("Cancelled: {operation}")]
    Cancelled {
        /// Operation that was interrupted
        operation: String,
    },

    /// Configuration-related error
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration error
        message: String,
        /// Optional source error
        #[source]
        source: Option<BoxError>,
    },
}

impl Error {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Validation,
            Self::Provisioning { .. } => ErrorKind::Provisioning,
            Self::Serialization { .. } => ErrorKind::Serialization,
            Self::Transport { .. } => ErrorKind::Transport,
            Self::Cancelled { .. } => ErrorKind::Cancelled,
            Self::Configuration { .. } => ErrorKind::Configuration,
        }
    }

    /// True when the error reports an expected cancellation rather than a fault
    pub fn is_cancelled(&self) -> bool {
        self.kind() == ErrorKind::Cancelled
    }
}

// Basic error creation methods
impl Error {
    /// Create a validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a cancellation error
    pub fn cancelled<S: Into<String>>(operation: S) -> Self {
        Self::Cancelled {
            operation: operation.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
            source: None,
        }
    }

    /// Create a configuration error with source
    pub fn configuration_with_source<
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    >(
        message: S,
        source: E,
    ) -> Self {
        Self::Configuration {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

// Broker error creation methods
impl Error {
    /// Create a provisioning error wrapping the backend cause
    pub fn provisioning<S: Into<String>>(
        step: ProvisionStep,
        resource: S,
        source: Option<BoxError>,
    ) -> Self {
        Self::Provisioning {
            step,
            resource: resource.into(),
            source,
        }
    }

    /// Create a serialization error
    pub fn serialization<S: Into<String>>(message: S) -> Self {
        Self::Serialization {
            message: message.into(),
            source: None,
        }
    }

    /// Create a transport error
    pub fn transport<O: Into<String>, S: Into<String>>(operation: O, message: S) -> Self {
        Self::Transport {
            operation: operation.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Create a transport error wrapping the backend cause
    pub fn transport_with_source<O: Into<String>>(operation: O, source: BoxError) -> Self {
        Self::Transport {
            operation: operation.into(),
            message: source.to_string(),
            source: Some(source),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(source: serde_json::Error) -> Self {
        Self::Serialization {
            message: format!("failed to encode message: {source}"),
            source: Some(Box::new(source)),
        }
    }
}
