//! Core data structures used across the index provisioner.
//! Re-exports `TodoDocument` and `SearchQuery`.

pub mod search_query;
pub mod todo_document;

pub use search_query::SearchQuery;
pub use todo_document::{Document, TodoDocument};
