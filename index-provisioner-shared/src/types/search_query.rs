//! Search query types.
//!
//! This module defines the engine-neutral query passed to `Search`.

use serde::{Deserialize, Serialize};

/// Maximum number of results a single query may request.
pub const MAX_LIMIT: usize = 100;

/// Search query parameters.
///
/// A full-text match of `query` against `fields`. An empty `fields` list
/// searches every field of the document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchQuery {
    /// The search query string.
    pub query: String,

    /// Fields to match against (e.g. `title`, `title.en`).
    /// Empty means all fields.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<String>,

    /// Maximum number of results to return.
    /// Default is 20, maximum is 100.
    #[serde(default = "default_limit")]
    pub limit: usize,

    /// Offset for pagination.
    /// Default is 0.
    #[serde(default)]
    pub offset: usize,
}

fn default_limit() -> usize {
    20
}

impl SearchQuery {
    /// Create a query that matches against every field.
    ///
    /// # Example
    ///
    /// ```
    /// use index_provisioner_shared::SearchQuery;
    ///
    /// let query = SearchQuery::all_fields("elasticsearch");
    /// assert!(query.fields.is_empty());
    /// ```
    pub fn all_fields(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            fields: Vec::new(),
            limit: default_limit(),
            offset: 0,
        }
    }

    /// Create a query that matches against a single field.
    ///
    /// # Example
    ///
    /// ```
    /// use index_provisioner_shared::SearchQuery;
    ///
    /// let query = SearchQuery::matching("title", "test");
    /// assert_eq!(query.fields, vec!["title".to_string()]);
    /// ```
    pub fn matching(field: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            fields: vec![field.into()],
            limit: default_limit(),
            offset: 0,
        }
    }

    /// Add another field to match against.
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.fields.push(field.into());
        self
    }

    /// Set the limit for results.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit.min(MAX_LIMIT);
        self
    }

    /// Set the offset for pagination.
    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// Validate the query parameters.
    ///
    /// Returns an error message if validation fails.
    pub fn validate(&self) -> Result<(), String> {
        if self.query.trim().is_empty() {
            return Err("Query string cannot be empty".to_string());
        }

        if self.limit == 0 || self.limit > MAX_LIMIT {
            return Err(format!("limit must be between 1 and {}", MAX_LIMIT));
        }

        if self.fields.iter().any(|f| f.trim().is_empty()) {
            return Err("Field names cannot be empty".to_string());
        }

        Ok(())
    }
}
