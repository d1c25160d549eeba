//! Provisioning error types.
//!
//! This module defines the caller-facing error type for index lifecycle and
//! document operations. Every variant tied to an index carries its name, and
//! lifecycle variants also carry the attempted operation and the state the
//! index was in when the call failed.

use thiserror::Error;

use crate::errors::EngineError;
use crate::types::{EngineOperation, IndexLifecycleState, IndexName};

/// Errors from index provisioning and document operations.
#[derive(Debug, Clone, Error)]
pub enum ProvisionError {
    /// The engine is unreachable or the request timed out. Not retried.
    #[error("Transport error during {operation} on index '{index}': {message}")]
    Transport {
        index: String,
        operation: EngineOperation,
        message: String,
    },

    /// `Create` was called for an index that already exists.
    #[error("Index '{index}' already exists")]
    AlreadyExists { index: String },

    /// The operation is not valid in the index's current lifecycle state.
    #[error("Cannot {operation} index '{index}' while it is {state}")]
    InvalidState {
        index: String,
        operation: EngineOperation,
        state: IndexLifecycleState,
    },

    /// The mapping references a normalizer that is not defined on the index.
    #[error("Mapping for index '{index}' references unknown normalizer '{normalizer}'")]
    UnknownNormalizer {
        index: String,
        normalizer: String,
        field: Option<String>,
    },

    /// A step after closing the index failed, leaving it closed and unusable
    /// until it is reopened.
    #[error("Index '{index}' left {state} after {operation} failed: {message}")]
    PartialConfiguration {
        index: String,
        operation: EngineOperation,
        state: IndexLifecycleState,
        message: String,
    },

    /// The engine refused the request for a reason not covered above.
    #[error("Engine rejected {operation} on index '{index}' with status {status}: {reason}")]
    Rejected {
        index: String,
        operation: EngineOperation,
        status: u16,
        reason: String,
    },

    /// Document not found.
    #[error("Document '{id}' not found in index '{index}'")]
    DocumentNotFound { index: String, id: String },

    /// Validation error (invalid names, inconsistent schema, bad query).
    #[error("Validation error: {0}")]
    Validation(String),

    /// Failed to convert a document to or from the engine representation.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl ProvisionError {
    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a serialization error.
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    /// Create an invalid state error.
    pub fn invalid_state(
        index: &IndexName,
        operation: EngineOperation,
        state: IndexLifecycleState,
    ) -> Self {
        Self::InvalidState {
            index: index.to_string(),
            operation,
            state,
        }
    }

    /// Create an unknown normalizer error.
    pub fn unknown_normalizer(
        index: &IndexName,
        normalizer: impl Into<String>,
        field: Option<String>,
    ) -> Self {
        Self::UnknownNormalizer {
            index: index.to_string(),
            normalizer: normalizer.into(),
            field,
        }
    }

    /// Create a partial configuration error for an index left closed.
    pub fn left_closed(index: &IndexName, operation: EngineOperation, cause: &EngineError) -> Self {
        Self::PartialConfiguration {
            index: index.to_string(),
            operation,
            state: IndexLifecycleState::Closed,
            message: cause.to_string(),
        }
    }

    /// Create a document not found error.
    pub fn document_not_found(index: &IndexName, id: impl Into<String>) -> Self {
        Self::DocumentNotFound {
            index: index.to_string(),
            id: id.into(),
        }
    }

    /// Translate an engine error into the provisioning taxonomy.
    ///
    /// # Arguments
    ///
    /// * `index` - The index the failed call targeted
    /// * `operation` - The remote operation that failed
    /// * `err` - The error reported by the engine
    pub fn from_engine(index: &IndexName, operation: EngineOperation, err: EngineError) -> Self {
        if let Some(normalizer) = err.missing_normalizer() {
            return Self::unknown_normalizer(index, normalizer, None);
        }

        match err {
            EngineError::Transport(message) => Self::Transport {
                index: index.to_string(),
                operation,
                message,
            },
            EngineError::IndexAlreadyExists(_) => Self::AlreadyExists {
                index: index.to_string(),
            },
            EngineError::IndexNotFound(_) => {
                Self::invalid_state(index, operation, IndexLifecycleState::Absent)
            }
            EngineError::IndexClosed(_) => {
                Self::invalid_state(index, operation, IndexLifecycleState::Closed)
            }
            EngineError::Rejected { status, reason, .. } => Self::Rejected {
                index: index.to_string(),
                operation,
                status,
                reason,
            },
            EngineError::Parse(message) => Self::Serialization(format!(
                "Failed to parse {} response for index '{}': {}",
                operation, index, message
            )),
        }
    }

    /// The index this error relates to, if any.
    pub fn index(&self) -> Option<&str> {
        match self {
            Self::Transport { index, .. }
            | Self::AlreadyExists { index }
            | Self::InvalidState { index, .. }
            | Self::UnknownNormalizer { index, .. }
            | Self::PartialConfiguration { index, .. }
            | Self::Rejected { index, .. }
            | Self::DocumentNotFound { index, .. } => Some(index),
            Self::Validation(_) | Self::Serialization(_) => None,
        }
    }

    /// The lifecycle state known at the time of failure, if the error carries one.
    pub fn lifecycle_state(&self) -> Option<IndexLifecycleState> {
        match self {
            Self::InvalidState { state, .. } | Self::PartialConfiguration { state, .. } => {
                Some(*state)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn todos() -> IndexName {
        IndexName::new("todos").unwrap()
    }

    #[test]
    fn test_from_engine_transport() {
        let err = ProvisionError::from_engine(
            &todos(),
            EngineOperation::Delete,
            EngineError::transport("connection refused"),
        );
        assert!(matches!(
            err,
            ProvisionError::Transport {
                operation: EngineOperation::Delete,
                ..
            }
        ));
        assert_eq!(err.index(), Some("todos"));
    }

    #[test]
    fn test_from_engine_already_exists() {
        let err = ProvisionError::from_engine(
            &todos(),
            EngineOperation::Create,
            EngineError::index_already_exists("todos"),
        );
        assert!(matches!(err, ProvisionError::AlreadyExists { .. }));
    }

    #[test]
    fn test_from_engine_lifecycle_states() {
        let err = ProvisionError::from_engine(
            &todos(),
            EngineOperation::PutMapping,
            EngineError::index_closed("todos"),
        );
        assert_eq!(err.lifecycle_state(), Some(IndexLifecycleState::Closed));

        let err = ProvisionError::from_engine(
            &todos(),
            EngineOperation::Close,
            EngineError::index_not_found("todos"),
        );
        assert_eq!(err.lifecycle_state(), Some(IndexLifecycleState::Absent));
    }

    #[test]
    fn test_from_engine_unknown_normalizer() {
        let err = ProvisionError::from_engine(
            &todos(),
            EngineOperation::PutMapping,
            EngineError::rejected(
                400,
                "mapper_parsing_exception",
                "normalizer [lowercase_normalizer] not found for field [lowercase]",
            ),
        );
        match err {
            ProvisionError::UnknownNormalizer { normalizer, .. } => {
                assert_eq!(normalizer, "lowercase_normalizer");
            }
            other => panic!("Expected UnknownNormalizer, got {:?}", other),
        }
    }

    #[test]
    fn test_from_engine_other_rejection() {
        let err = ProvisionError::from_engine(
            &todos(),
            EngineOperation::PutSettings,
            EngineError::rejected(400, "illegal_argument_exception", "unknown filter"),
        );
        assert!(matches!(
            err,
            ProvisionError::Rejected {
                status: 400,
                operation: EngineOperation::PutSettings,
                ..
            }
        ));
    }

    #[test]
    fn test_left_closed_message() {
        let err = ProvisionError::left_closed(
            &todos(),
            EngineOperation::Open,
            &EngineError::transport("connection reset"),
        );
        assert_eq!(
            err.to_string(),
            "Index 'todos' left closed after open failed: Transport error: connection reset"
        );
        assert_eq!(err.lifecycle_state(), Some(IndexLifecycleState::Closed));
    }

    #[test]
    fn test_validation_has_no_index() {
        let err = ProvisionError::validation("bad");
        assert!(err.index().is_none());
        assert!(err.lifecycle_state().is_none());
    }
}
