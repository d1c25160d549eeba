//! Search engine client trait definition.
//!
//! This module defines the capability set the provisioner and the document
//! service need from a search engine, allowing for different backend
//! implementations (OpenSearch, the in-memory mock, etc.).

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::EngineError;
use crate::schema::{FieldMapping, NormalizerSpec};
use crate::types::IndexLifecycleState;
use index_provisioner_shared::SearchQuery;

/// A single search hit as returned by the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineHit {
    /// Document id.
    pub id: String,
    /// Relevance score. Higher is better.
    pub score: f64,
    /// The stored document source.
    pub source: Value,
}

/// Abstract interface for search engine operations.
///
/// Each method is one remote call. Implementations must not retry and must not
/// combine calls: ordering is owned by the `IndexProvisioner`.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync` to allow use across async tasks.
///
/// # Error Handling
///
/// All methods return `Result<T, EngineError>`. Implementations map the
/// engine's own "index not found", "already exists" and "index closed"
/// responses to the matching `EngineError` variants so that callers can rely
/// on them regardless of backend.
#[async_trait]
pub trait SearchEngineClient: Send + Sync {
    /// Check whether the index exists.
    async fn exists(&self, index: &str) -> Result<bool, EngineError>;

    /// Report the lifecycle state of the index.
    ///
    /// Returns `IndexLifecycleState::Absent` if the index does not exist.
    async fn status(&self, index: &str) -> Result<IndexLifecycleState, EngineError>;

    /// Create an empty, open index.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - If the index was created
    /// * `Err(EngineError::IndexAlreadyExists)` - If the index exists
    async fn create(&self, index: &str) -> Result<(), EngineError>;

    /// Delete the index and all of its documents.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - If the index was deleted
    /// * `Err(EngineError::IndexNotFound)` - If the index does not exist
    async fn delete(&self, index: &str) -> Result<(), EngineError>;

    /// Close the index.
    async fn close(&self, index: &str) -> Result<(), EngineError>;

    /// Open the index.
    async fn open(&self, index: &str) -> Result<(), EngineError>;

    /// Define normalizers in the index analysis settings.
    ///
    /// Engines only accept analysis changes on a closed index.
    async fn put_settings(
        &self,
        index: &str,
        normalizers: &[NormalizerSpec],
    ) -> Result<(), EngineError>;

    /// Add fields to the index mapping.
    ///
    /// Applying an identical mapping again is a no-op.
    async fn put_mapping(&self, index: &str, mapping: &FieldMapping) -> Result<(), EngineError>;

    /// Store a document under the given id, replacing any previous version.
    async fn index_document(&self, index: &str, id: &str, source: &Value)
        -> Result<(), EngineError>;

    /// Fetch a document source by id.
    ///
    /// Returns `Ok(None)` if the index exists but has no document with that id.
    async fn get_document(&self, index: &str, id: &str) -> Result<Option<Value>, EngineError>;

    /// Execute a full-text query.
    async fn search(&self, index: &str, query: &SearchQuery) -> Result<Vec<EngineHit>, EngineError>;

    /// Check that the engine is reachable.
    async fn ping(&self) -> Result<bool, EngineError>;
}
