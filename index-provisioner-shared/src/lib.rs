//! # Index Provisioner Shared
//!
//! Engine-neutral data structures shared by the index provisioner crates:
//! the `Document` trait, the demo `TodoDocument`, and `SearchQuery`.

pub mod types;

pub use types::search_query::SearchQuery;
pub use types::todo_document::{Document, TodoDocument};
