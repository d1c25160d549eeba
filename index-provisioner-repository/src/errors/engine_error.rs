//! Search engine error types.
//!
//! Errors reported by a `SearchEngineClient` implementation. They describe what
//! the engine said, without any knowledge of the provisioning sequence.

use thiserror::Error;

/// Errors that can occur while talking to the search engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The engine could not be reached, or the request timed out.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The target index does not exist.
    #[error("Index not found: {0}")]
    IndexNotFound(String),

    /// The target index already exists.
    #[error("Index already exists: {0}")]
    IndexAlreadyExists(String),

    /// The target index is closed.
    #[error("Index closed: {0}")]
    IndexClosed(String),

    /// The engine refused the request for another reason.
    #[error("Request rejected with status {status} ({error_type}): {reason}")]
    Rejected {
        status: u16,
        error_type: String,
        reason: String,
    },

    /// Failed to parse a response from the engine.
    #[error("Parse error: {0}")]
    Parse(String),
}

impl EngineError {
    /// Create a transport error.
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create an index not found error.
    pub fn index_not_found(index: impl Into<String>) -> Self {
        Self::IndexNotFound(index.into())
    }

    /// Create an index already exists error.
    pub fn index_already_exists(index: impl Into<String>) -> Self {
        Self::IndexAlreadyExists(index.into())
    }

    /// Create an index closed error.
    pub fn index_closed(index: impl Into<String>) -> Self {
        Self::IndexClosed(index.into())
    }

    /// Create a rejection error.
    pub fn rejected(status: u16, error_type: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Rejected {
            status,
            error_type: error_type.into(),
            reason: reason.into(),
        }
    }

    /// Create a parse error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Extract the normalizer name from a mapper rejection such as
    /// `normalizer [lowercase_normalizer] not found for field [lowercase]`.
    ///
    /// Returns `None` for any other error.
    pub fn missing_normalizer(&self) -> Option<&str> {
        let Self::Rejected { reason, .. } = self else {
            return None;
        };

        let rest = reason.split("normalizer [").nth(1)?;
        let (name, tail) = rest.split_once(']')?;
        if tail.trim_start().starts_with("not found") {
            Some(name)
        } else {
            None
        }
    }
}
