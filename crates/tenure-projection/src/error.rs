//! Error types for the projection domain.

/// The result type used throughout tenure-projection.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while projecting events.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The event payload could not be decoded into its typed form.
    #[error("malformed {event_type} payload: {message}")]
    MalformedEvent {
        /// The event type being decoded.
        event_type: String,
        /// Decoder message.
        message: String,
    },

    /// No handler is registered for the event type.
    #[error("unknown event type: {event_type}")]
    UnknownEventType {
        /// The unrecognized event type.
        event_type: String,
    },

    /// A required entity does not exist.
    #[error("{entity} {id} does not exist")]
    EntityNotFound {
        /// Kind of entity that was looked up.
        entity: &'static str,
        /// The identifier that was looked up.
        id: String,
    },

    /// A storage operation failed.
    #[error("storage error: {message}")]
    Storage {
        /// Description of the storage failure.
        message: String,
        /// The underlying cause, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A sibling-service call failed.
    #[error("dispatch error: {message}")]
    Dispatch {
        /// Description of the failure.
        message: String,
        /// Whether retrying the call may succeed.
        retryable: bool,
    },

    /// Configuration could not be loaded.
    #[error("configuration error: {message}")]
    Configuration {
        /// Description of the configuration problem.
        message: String,
    },

    /// An error from tenure-core.
    #[error("core error: {0}")]
    Core(#[from] tenure_core::Error),
}

impl Error {
    /// Creates a new storage error.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new storage error with a source.
    #[must_use]
    pub fn storage_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Storage {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a retryable dispatch error.
    #[must_use]
    pub fn dispatch(message: impl Into<String>) -> Self {
        Self::Dispatch {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a dispatch error that must not be retried.
    #[must_use]
    pub fn dispatch_permanent(message: impl Into<String>) -> Self {
        Self::Dispatch {
            message: message.into(),
            retryable: false,
        }
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates an entity-not-found error.
    #[must_use]
    pub fn not_found(entity: &'static str, id: impl std::fmt::Display) -> Self {
        Self::EntityNotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Returns true if this error reports a missing entity.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::EntityNotFound { .. } | Self::Core(tenure_core::Error::ResourceNotFound { .. })
        )
    }

    /// Returns true if a sibling-service call may succeed when retried.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Dispatch {
                retryable: true,
                ..
            }
        )
    }

    /// Short label used for metrics and logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::MalformedEvent { .. } => "malformed_event",
            Self::UnknownEventType { .. } => "unknown_event_type",
            Self::EntityNotFound { .. } => "not_found",
            Self::Storage { .. } => "storage",
            Self::Dispatch { .. } => "dispatch",
            Self::Configuration { .. } => "configuration",
            Self::Core(_) => "core",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as StdError;

    #[test]
    fn not_found_display() {
        let err = Error::not_found("milestone", "01J");
        assert_eq!(err.to_string(), "milestone 01J does not exist");
        assert!(err.is_not_found());
    }

    #[test]
    fn core_not_found_counts_as_not_found() {
        let err: Error = tenure_core::Error::resource_not_found("plan", "p-1").into();
        assert!(err.is_not_found());
        assert_eq!(err.kind(), "core");
    }

    #[test]
    fn dispatch_retryability() {
        assert!(Error::dispatch("503 from organization service").is_retryable());
        assert!(!Error::dispatch_permanent("invalid argument").is_retryable());
        assert!(!Error::storage("down").is_retryable());
    }

    #[test]
    fn storage_error_with_source() {
        let source = std::io::Error::new(std::io::ErrorKind::TimedOut, "graph timeout");
        let err = Error::storage_with_source("failed to save plan", source);
        assert!(err.to_string().contains("storage error"));
        assert!(StdError::source(&err).is_some());
    }

    #[test]
    fn malformed_event_mentions_type() {
        let err = Error::MalformedEvent {
            event_type: "V1_CONTRACT_UPDATE".into(),
            message: "missing field `updatedAt`".into(),
        };
        assert!(err.to_string().contains("V1_CONTRACT_UPDATE"));
        assert_eq!(err.kind(), "malformed_event");
    }
}
