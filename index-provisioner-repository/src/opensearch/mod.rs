//! OpenSearch implementation of the search engine client.
//!
//! This module provides a concrete implementation of `SearchEngineClient`
//! using OpenSearch as the backend, plus the todo index configuration.

mod client;
mod index_config;
pub mod requests;

pub use client::{OpenSearchConfig, OpenSearchEngine};
pub use index_config::{todos_schema, LOWERCASE_NORMALIZER, TODOS_INDEX};
