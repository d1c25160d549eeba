//! Document types for the search index.
//!
//! This module defines the `Document` trait used by the document operations and
//! the `TodoDocument` stored in the `todos` index.

use serde::{Deserialize, Serialize};

/// A document that can be written to a search index.
///
/// The id is assigned by the caller and must be unique within the index.
/// Writing a document with an existing id replaces the stored one.
pub trait Document {
    /// The id under which the document is stored.
    fn document_id(&self) -> &str;
}

/// A todo item as it is stored in the `todos` index.
///
/// # Fields
///
/// - `id`: Caller-assigned identifier (also the index document id)
/// - `title`: Short title, the primary search field
/// - `description`: Free text description
/// - `done`: Completion flag
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TodoDocument {
    pub id: String,
    pub title: String,
    pub description: String,
    pub done: bool,
}

impl TodoDocument {
    /// Create a new todo.
    ///
    /// # Example
    ///
    /// ```
    /// use index_provisioner_shared::TodoDocument;
    ///
    /// let todo = TodoDocument::new("1", "Buy milk", "Semi-skimmed", false);
    /// assert_eq!(todo.id, "1");
    /// ```
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
        done: bool,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: description.into(),
            done,
        }
    }
}

impl Document for TodoDocument {
    fn document_id(&self) -> &str {
        &self.id
    }
}
