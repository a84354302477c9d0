//! Errors raised by the core primitives.
//!
//! Callers match on the variant. Messages are for logs only.

use std::fmt;

use crate::action::ActionValidationError;

/// Result alias for tenure-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Failure of a core operation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A tenant key or entity identifier failed validation.
    #[error("invalid identifier: {message}")]
    InvalidId {
        /// What was wrong with the identifier.
        message: String,
    },

    /// A value outside an identifier could not be parsed.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An action record was missing required fields.
    #[error("invalid action: {0}")]
    InvalidAction(#[from] ActionValidationError),

    /// The action sink or another backing store refused the operation.
    #[error("storage error: {message}")]
    Storage {
        /// What the store reported.
        message: String,
    },

    /// A lookup by id found nothing.
    #[error("{kind} {id} not found")]
    ResourceNotFound {
        /// Entity kind, e.g. `contract`.
        kind: &'static str,
        /// The id that was looked up.
        id: String,
    },
}

impl Error {
    /// Storage failure with a message.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Missing entity of the given kind.
    #[must_use]
    pub fn resource_not_found(kind: &'static str, id: impl fmt::Display) -> Self {
        Self::ResourceNotFound {
            kind,
            id: id.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_names_kind_and_id() {
        let err = Error::resource_not_found("contract", "01HZX");
        assert_eq!(err.to_string(), "contract 01HZX not found");
    }

    #[test]
    fn action_validation_converts() {
        let err: Error = ActionValidationError::MissingField { field: "tenant" }.into();
        assert!(matches!(err, Error::InvalidAction(_)));
        assert!(err.to_string().starts_with("invalid action"));
    }
}
