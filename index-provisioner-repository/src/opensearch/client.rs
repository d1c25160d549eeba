//! OpenSearch engine implementation.
//!
//! This module provides the concrete implementation of `SearchEngineClient`
//! using the OpenSearch Rust crate.

use async_trait::async_trait;
use opensearch::{
    auth::Credentials,
    cat::CatIndicesParts,
    http::response::Response,
    http::transport::{SingleNodeConnectionPool, TransportBuilder},
    indices::{
        IndicesCloseParts, IndicesCreateParts, IndicesDeleteParts, IndicesExistsParts,
        IndicesOpenParts, IndicesPutMappingParts, IndicesPutSettingsParts,
    },
    params::Refresh,
    GetParts, IndexParts, OpenSearch, SearchParts,
};
use serde_json::Value;
use tracing::{debug, error, info};
use url::Url;

use crate::errors::EngineError;
use crate::interfaces::{EngineHit, SearchEngineClient};
use crate::opensearch::requests;
use crate::schema::{FieldMapping, NormalizerSpec};
use crate::types::IndexLifecycleState;
use index_provisioner_shared::SearchQuery;

/// Connection settings for `OpenSearchEngine`.
#[derive(Debug, Clone)]
pub struct OpenSearchConfig {
    /// The OpenSearch server URL (e.g., "http://localhost:9200").
    pub url: String,
    /// Basic auth username and password.
    pub credentials: Option<(String, String)>,
    /// Wait for a refresh after each document write so it is immediately searchable.
    pub refresh_on_write: bool,
}

impl OpenSearchConfig {
    /// Create a config for the given URL, without auth, refreshing on write.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            credentials: None,
            refresh_on_write: true,
        }
    }

    /// Use basic auth.
    pub fn with_basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Some((username.into(), password.into()));
        self
    }

    /// Enable or disable `refresh=wait_for` on document writes.
    pub fn with_refresh_on_write(mut self, refresh_on_write: bool) -> Self {
        self.refresh_on_write = refresh_on_write;
        self
    }
}

/// OpenSearch engine implementation.
///
/// Every trait method issues exactly one HTTP request.
///
/// # Example
///
/// ```ignore
/// use index_provisioner_repository::opensearch::{OpenSearchConfig, OpenSearchEngine};
///
/// let engine = OpenSearchEngine::new(OpenSearchConfig::new("http://localhost:9200")).await?;
/// let exists = engine.exists("todos").await?;
/// ```
pub struct OpenSearchEngine {
    client: OpenSearch,
    refresh_on_write: bool,
}

impl OpenSearchEngine {
    /// Create a new OpenSearch engine client for the configured URL.
    ///
    /// No request is sent; use `ping` to check connectivity.
    ///
    /// # Returns
    ///
    /// * `Ok(OpenSearchEngine)` - A new client instance
    /// * `Err(EngineError::Transport)` - If the URL is invalid or the transport cannot be built
    pub async fn new(config: OpenSearchConfig) -> Result<Self, EngineError> {
        let parsed_url = Url::parse(&config.url).map_err(|e| EngineError::transport(e.to_string()))?;

        let conn_pool = SingleNodeConnectionPool::new(parsed_url);
        let mut builder = TransportBuilder::new(conn_pool).disable_proxy();
        if let Some((username, password)) = config.credentials.clone() {
            builder = builder.auth(Credentials::Basic(username, password));
        }
        let transport = builder
            .build()
            .map_err(|e| EngineError::transport(e.to_string()))?;

        info!(
            url = %config.url,
            basic_auth = config.credentials.is_some(),
            refresh_on_write = config.refresh_on_write,
            "Created OpenSearch engine client"
        );

        Ok(Self {
            client: OpenSearch::new(transport),
            refresh_on_write: config.refresh_on_write,
        })
    }

    /// Turn a non-success response into an `EngineError`.
    async fn rejection(response: Response) -> EngineError {
        let status = response.status_code().as_u16();
        match response.text().await {
            Ok(body) => {
                let err = requests::error_from_body(status, &body);
                error!(status = status, error = %err, "OpenSearch request failed");
                err
            }
            Err(e) => EngineError::transport(e.to_string()),
        }
    }

    /// Return `Ok(())` for a success response, otherwise the mapped error.
    async fn expect_success(response: Response) -> Result<(), EngineError> {
        if response.status_code().is_success() {
            Ok(())
        } else {
            Err(Self::rejection(response).await)
        }
    }
}

fn transport_error(e: opensearch::Error) -> EngineError {
    EngineError::transport(e.to_string())
}

#[async_trait]
impl SearchEngineClient for OpenSearchEngine {
    async fn exists(&self, index: &str) -> Result<bool, EngineError> {
        let response = self
            .client
            .indices()
            .exists(IndicesExistsParts::Index(&[index]))
            .send()
            .await
            .map_err(transport_error)?;

        match response.status_code().as_u16() {
            200 => Ok(true),
            404 => Ok(false),
            _ => Err(Self::rejection(response).await),
        }
    }

    async fn status(&self, index: &str) -> Result<IndexLifecycleState, EngineError> {
        let response = self
            .client
            .cat()
            .indices(CatIndicesParts::Index(&[index]))
            .format("json")
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status_code();
        if status.as_u16() == 404 {
            return Ok(IndexLifecycleState::Absent);
        }
        if !status.is_success() {
            return Err(Self::rejection(response).await);
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| EngineError::parse(e.to_string()))?;
        requests::parse_cat_status(&body)
    }

    async fn create(&self, index: &str) -> Result<(), EngineError> {
        let response = self
            .client
            .indices()
            .create(IndicesCreateParts::Index(index))
            .send()
            .await
            .map_err(transport_error)?;

        Self::expect_success(response).await?;
        debug!(index = %index, "Index created");
        Ok(())
    }

    async fn delete(&self, index: &str) -> Result<(), EngineError> {
        let response = self
            .client
            .indices()
            .delete(IndicesDeleteParts::Index(&[index]))
            .send()
            .await
            .map_err(transport_error)?;

        Self::expect_success(response).await?;
        debug!(index = %index, "Index deleted");
        Ok(())
    }

    async fn close(&self, index: &str) -> Result<(), EngineError> {
        let response = self
            .client
            .indices()
            .close(IndicesCloseParts::Index(&[index]))
            .send()
            .await
            .map_err(transport_error)?;

        Self::expect_success(response).await?;
        debug!(index = %index, "Index closed");
        Ok(())
    }

    async fn open(&self, index: &str) -> Result<(), EngineError> {
        let response = self
            .client
            .indices()
            .open(IndicesOpenParts::Index(&[index]))
            .send()
            .await
            .map_err(transport_error)?;

        Self::expect_success(response).await?;
        debug!(index = %index, "Index opened");
        Ok(())
    }

    async fn put_settings(
        &self,
        index: &str,
        normalizers: &[NormalizerSpec],
    ) -> Result<(), EngineError> {
        let response = self
            .client
            .indices()
            .put_settings(IndicesPutSettingsParts::Index(&[index]))
            .body(requests::settings_body(normalizers))
            .send()
            .await
            .map_err(transport_error)?;

        Self::expect_success(response).await?;
        debug!(index = %index, count = normalizers.len(), "Analysis settings updated");
        Ok(())
    }

    async fn put_mapping(&self, index: &str, mapping: &FieldMapping) -> Result<(), EngineError> {
        let body = requests::mapping_body(mapping)?;

        let response = self
            .client
            .indices()
            .put_mapping(IndicesPutMappingParts::Index(&[index]))
            .body(body)
            .send()
            .await
            .map_err(transport_error)?;

        Self::expect_success(response).await?;
        debug!(index = %index, fields = mapping.properties.len(), "Mapping updated");
        Ok(())
    }

    async fn index_document(
        &self,
        index: &str,
        id: &str,
        source: &Value,
    ) -> Result<(), EngineError> {
        let mut request = self.client.index(IndexParts::IndexId(index, id)).body(source);
        if self.refresh_on_write {
            request = request.refresh(Refresh::WaitFor);
        }

        let response = request.send().await.map_err(transport_error)?;

        Self::expect_success(response).await?;
        debug!(index = %index, doc_id = %id, "Document indexed");
        Ok(())
    }

    async fn get_document(&self, index: &str, id: &str) -> Result<Option<Value>, EngineError> {
        let response = self
            .client
            .get(GetParts::IndexId(index, id))
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status_code();
        if !status.is_success() && status.as_u16() != 404 {
            return Err(Self::rejection(response).await);
        }

        let body = response.text().await.map_err(transport_error)?;
        requests::parse_get_body(status.as_u16(), &body)
    }

    async fn search(&self, index: &str, query: &SearchQuery) -> Result<Vec<EngineHit>, EngineError> {
        let response = self
            .client
            .search(SearchParts::Index(&[index]))
            .body(requests::search_body(query))
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status_code().is_success() {
            return Err(Self::rejection(response).await);
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| EngineError::parse(e.to_string()))?;
        let hits = requests::parse_hits(&body)?;

        debug!(index = %index, hits = hits.len(), "Search executed");
        Ok(hits)
    }

    async fn ping(&self) -> Result<bool, EngineError> {
        let response = self.client.ping().send().await.map_err(transport_error)?;
        Ok(response.status_code().is_success())
    }
}
