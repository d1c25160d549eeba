//! Search index service implementation.
//!
//! This module provides the main service for working with provisioned
//! indices. Application code uses it to ensure an index is configured and then
//! to store, fetch and search documents in it.
//!
//! Document operations take an `IndexHandle`, which only `ensure_index` hands
//! out, so documents are never written to an index that has not been
//! provisioned.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::config::ProvisionerConfig;
use crate::errors::ProvisionError;
use crate::interfaces::SearchEngineClient;
use crate::locks::IndexLease;
use crate::provisioner::IndexProvisioner;
use crate::schema::Schema;
use crate::types::{EngineOperation, IndexHandle};
use crate::utils::with_deadline;
use index_provisioner_shared::{Document, SearchQuery};

/// The main service for interacting with provisioned indices.
///
/// This is the high-level API that application code should use. It validates
/// input, converts documents to and from JSON, and delegates to a
/// `SearchEngineClient` for the remote calls. All operations return
/// `ProvisionError`.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use index_provisioner_repository::{IndexLocks, IndexName, SearchIndexService};
/// use index_provisioner_repository::opensearch::{todos_schema, OpenSearchConfig, OpenSearchEngine};
/// use index_provisioner_shared::TodoDocument;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let engine = OpenSearchEngine::new(OpenSearchConfig::new("http://localhost:9200")).await?;
/// let service = SearchIndexService::new(Arc::new(engine));
/// let locks = IndexLocks::new();
///
/// let lease = locks.acquire(IndexName::new("todos")?).await;
/// let handle = service.ensure_index(&lease, &todos_schema(), true).await?;
///
/// let todo = TodoDocument::new("1", "Test elasticsearch", "Test description", true);
/// service.put(&handle, &todo).await?;
/// let stored: TodoDocument = service.get(&handle, "1").await?;
/// assert_eq!(stored, todo);
/// # Ok(())
/// # }
/// ```
pub struct SearchIndexService {
    engine: Arc<dyn SearchEngineClient>,
    provisioner: IndexProvisioner,
}

impl SearchIndexService {
    /// Create a new SearchIndexService with default configuration.
    ///
    /// # Arguments
    ///
    /// * `engine` - An implementation of `SearchEngineClient` (e.g., `OpenSearchEngine`)
    pub fn new(engine: Arc<dyn SearchEngineClient>) -> Self {
        Self::with_config(engine, ProvisionerConfig::default())
    }

    /// Create a new SearchIndexService with custom configuration.
    pub fn with_config(engine: Arc<dyn SearchEngineClient>, config: ProvisionerConfig) -> Self {
        Self {
            provisioner: IndexProvisioner::with_config(engine.clone(), config),
            engine,
        }
    }

    /// The provisioner used for lifecycle operations.
    pub fn provisioner(&self) -> &IndexProvisioner {
        &self.provisioner
    }

    /// Ensure the index exists with the given schema.
    ///
    /// See [`IndexProvisioner::ensure_index`].
    pub async fn ensure_index(
        &self,
        lease: &IndexLease,
        schema: &Schema,
        reset: bool,
    ) -> Result<IndexHandle, ProvisionError> {
        self.provisioner.ensure_index(lease, schema, reset).await
    }

    fn validate_id(id: &str) -> Result<(), ProvisionError> {
        if id.trim().is_empty() {
            return Err(ProvisionError::validation("Document id is required"));
        }
        Ok(())
    }

    /// Store a document under its id, replacing any previous version.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - If the document was stored
    /// * `Err(ProvisionError::Validation)` - If the document id is empty
    /// * `Err(ProvisionError::InvalidState)` - If the index is closed or was deleted
    pub async fn put<D>(&self, handle: &IndexHandle, document: &D) -> Result<(), ProvisionError>
    where
        D: Document + Serialize + Sync,
    {
        let id = document.document_id();
        Self::validate_id(id)?;

        let source = serde_json::to_value(document).map_err(|e| {
            ProvisionError::serialization(format!("Failed to serialize document '{}': {}", id, e))
        })?;

        let name = handle.name();
        with_deadline(
            self.provisioner.config().request_timeout,
            self.engine.index_document(name.as_str(), id, &source),
        )
        .await
        .map_err(|e| ProvisionError::from_engine(name, EngineOperation::IndexDocument, e))?;

        info!(index = %name, doc_id = %id, "Document stored");
        Ok(())
    }

    /// Fetch a document by id.
    ///
    /// # Returns
    ///
    /// * `Ok(D)` - The stored document
    /// * `Err(ProvisionError::DocumentNotFound)` - If no document has that id
    /// * `Err(ProvisionError::Serialization)` - If the stored source does not match `D`
    pub async fn get<D>(&self, handle: &IndexHandle, id: &str) -> Result<D, ProvisionError>
    where
        D: DeserializeOwned,
    {
        Self::validate_id(id)?;

        let name = handle.name();
        let source = with_deadline(
            self.provisioner.config().request_timeout,
            self.engine.get_document(name.as_str(), id),
        )
        .await
        .map_err(|e| ProvisionError::from_engine(name, EngineOperation::GetDocument, e))?
        .ok_or_else(|| ProvisionError::document_not_found(name, id))?;

        debug!(index = %name, doc_id = %id, "Document fetched");
        decode(source, id)
    }

    /// Run a full-text query, returning matching documents best first.
    pub async fn search<D>(
        &self,
        handle: &IndexHandle,
        query: &SearchQuery,
    ) -> Result<Vec<D>, ProvisionError>
    where
        D: DeserializeOwned,
    {
        query.validate().map_err(ProvisionError::validation)?;

        let name = handle.name();
        let hits = with_deadline(
            self.provisioner.config().request_timeout,
            self.engine.search(name.as_str(), query),
        )
        .await
        .map_err(|e| ProvisionError::from_engine(name, EngineOperation::Search, e))?;

        debug!(index = %name, query = %query.query, hits = hits.len(), "Search completed");
        hits.into_iter()
            .map(|hit| decode(hit.source, &hit.id))
            .collect()
    }
}

fn decode<D: DeserializeOwned>(source: Value, id: &str) -> Result<D, ProvisionError> {
    serde_json::from_value(source).map_err(|e| {
        ProvisionError::serialization(format!("Failed to deserialize document '{}': {}", id, e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locks::IndexLocks;
    use crate::mock::{Fault, MockSearchEngine};
    use crate::opensearch::todos_schema;
    use crate::types::{IndexLifecycleState, IndexName};
    use index_provisioner_shared::TodoDocument;

    async fn setup() -> (Arc<MockSearchEngine>, SearchIndexService, IndexHandle) {
        let engine = Arc::new(MockSearchEngine::new());
        let service = SearchIndexService::new(engine.clone());
        let locks = IndexLocks::new();
        let lease = locks.acquire(IndexName::new("todos").unwrap()).await;
        let handle = service
            .ensure_index(&lease, &todos_schema(), true)
            .await
            .unwrap();
        (engine, service, handle)
    }

    fn todo() -> TodoDocument {
        TodoDocument::new("1", "Test elasticsearch", "Test description", true)
    }

    #[tokio::test]
    async fn test_put_then_get_returns_identical_document() {
        let (_engine, service, handle) = setup().await;

        service.put(&handle, &todo()).await.unwrap();
        let stored: TodoDocument = service.get(&handle, "1").await.unwrap();

        assert_eq!(stored, todo());
    }

    #[tokio::test]
    async fn test_put_replaces_previous_version() {
        let (engine, service, handle) = setup().await;

        service.put(&handle, &todo()).await.unwrap();
        let mut updated = todo();
        updated.done = false;
        service.put(&handle, &updated).await.unwrap();

        let stored: TodoDocument = service.get(&handle, "1").await.unwrap();
        assert!(!stored.done);
        assert_eq!(engine.document_count("todos").await, 1);
    }

    #[tokio::test]
    async fn test_get_unknown_id() {
        let (_engine, service, handle) = setup().await;

        let err = service.get::<TodoDocument>(&handle, "42").await.unwrap_err();
        assert!(matches!(err, ProvisionError::DocumentNotFound { ref id, .. } if id == "42"));
    }

    #[tokio::test]
    async fn test_empty_ids_rejected() {
        let (engine, service, handle) = setup().await;
        engine.clear_calls().await;

        let doc = TodoDocument::new("", "Untitled", "", false);
        assert!(matches!(
            service.put(&handle, &doc).await,
            Err(ProvisionError::Validation(_))
        ));
        assert!(matches!(
            service.get::<TodoDocument>(&handle, " ").await,
            Err(ProvisionError::Validation(_))
        ));
        assert!(engine.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_search_title() {
        let (_engine, service, handle) = setup().await;
        service.put(&handle, &todo()).await.unwrap();
        service
            .put(&handle, &TodoDocument::new("2", "Buy milk", "Groceries", false))
            .await
            .unwrap();

        let results: Vec<TodoDocument> = service
            .search(&handle, &SearchQuery::matching("title", "test"))
            .await
            .unwrap();

        assert_eq!(results, vec![todo()]);
    }

    #[tokio::test]
    async fn test_search_invalid_query() {
        let (_engine, service, handle) = setup().await;

        let err = service
            .search::<TodoDocument>(&handle, &SearchQuery::matching("title", ""))
            .await
            .unwrap_err();
        assert!(matches!(err, ProvisionError::Validation(_)));
    }

    #[tokio::test]
    async fn test_put_on_closed_index() {
        let (engine, service, handle) = setup().await;
        engine.close("todos").await.unwrap();

        let err = service.put(&handle, &todo()).await.unwrap_err();
        assert_eq!(err.lifecycle_state(), Some(IndexLifecycleState::Closed));
    }

    #[tokio::test]
    async fn test_get_transport_failure() {
        let (engine, service, handle) = setup().await;
        engine
            .inject_fault(EngineOperation::GetDocument, Fault::transport("connection refused"))
            .await;

        let err = service.get::<TodoDocument>(&handle, "1").await.unwrap_err();
        assert!(matches!(
            err,
            ProvisionError::Transport {
                operation: EngineOperation::GetDocument,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_get_mismatched_document_type() {
        let (engine, service, handle) = setup().await;
        engine
            .index_document("todos", "7", &serde_json::json!({ "title": 7 }))
            .await
            .unwrap();

        let err = service.get::<TodoDocument>(&handle, "7").await.unwrap_err();
        assert!(matches!(err, ProvisionError::Serialization(_)));
    }
}
