//! Index lifecycle management.
//!
//! `IndexProvisioner` brings an index to a desired configuration while
//! respecting the engine's ordering rules: analysis settings change only on a
//! closed index, and the mapping is applied to the reopened index afterwards
//! so that it can reference the new normalizers.
//!
//! Every step is a single remote call. Nothing is retried and nothing is
//! rolled back: if a step after the close fails, the index is left closed and
//! the error says so.

use std::future::Future;
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::config::ProvisionerConfig;
use crate::errors::{EngineError, ProvisionError};
use crate::interfaces::SearchEngineClient;
use crate::locks::IndexLease;
use crate::schema::{FieldMapping, NormalizerSpec, Schema};
use crate::types::{EngineOperation, IndexHandle, IndexLifecycleState, IndexName};
use crate::utils::with_deadline;

/// Ensures indices exist with the desired settings and mapping.
///
/// The provisioner holds no connections or locks of its own. Concurrent
/// `ensure_index` calls for one index must be serialised by the caller, which
/// is why `ensure_index` takes an `IndexLease`.
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use index_provisioner_repository::{IndexLocks, IndexName, IndexProvisioner, MockSearchEngine};
/// use index_provisioner_repository::opensearch::todos_schema;
///
/// let provisioner = IndexProvisioner::new(Arc::new(MockSearchEngine::new()));
/// let locks = IndexLocks::new();
///
/// let lease = locks.acquire(IndexName::new("todos")?).await;
/// let handle = provisioner.ensure_index(&lease, &todos_schema(), true).await?;
/// ```
pub struct IndexProvisioner {
    engine: Arc<dyn SearchEngineClient>,
    config: ProvisionerConfig,
}

impl IndexProvisioner {
    /// Create a provisioner with the default configuration (30 s request deadline).
    pub fn new(engine: Arc<dyn SearchEngineClient>) -> Self {
        Self {
            engine,
            config: ProvisionerConfig::default(),
        }
    }

    /// Create a provisioner with a custom configuration.
    pub fn with_config(engine: Arc<dyn SearchEngineClient>, config: ProvisionerConfig) -> Self {
        Self { engine, config }
    }

    /// The configuration in use.
    pub fn config(&self) -> &ProvisionerConfig {
        &self.config
    }

    /// Run one engine call under the request deadline.
    async fn call<T, F>(
        &self,
        name: &IndexName,
        operation: EngineOperation,
        call: F,
    ) -> Result<T, EngineError>
    where
        F: Future<Output = Result<T, EngineError>>,
    {
        debug!(index = %name, operation = %operation, "Calling search engine");
        with_deadline(self.config.request_timeout, call).await
    }

    /// Run one engine call and translate its error.
    async fn run<T, F>(
        &self,
        name: &IndexName,
        operation: EngineOperation,
        call: F,
    ) -> Result<T, ProvisionError>
    where
        F: Future<Output = Result<T, EngineError>>,
    {
        self.call(name, operation, call)
            .await
            .map_err(|e| ProvisionError::from_engine(name, operation, e))
    }

    /// Check whether the index exists. No side effects.
    pub async fn exists(&self, name: &IndexName) -> Result<bool, ProvisionError> {
        self.run(name, EngineOperation::Exists, self.engine.exists(name.as_str()))
            .await
    }

    /// Report the lifecycle state of the index.
    pub async fn status(&self, name: &IndexName) -> Result<IndexLifecycleState, ProvisionError> {
        self.run(name, EngineOperation::Status, self.engine.status(name.as_str()))
            .await
    }

    /// Delete the index if it exists.
    ///
    /// Deleting an absent index is a no-op. Deletion is irreversible.
    #[instrument(skip_all, fields(index = %name))]
    pub async fn delete(&self, name: &IndexName) -> Result<(), ProvisionError> {
        if !self.exists(name).await? {
            warn!(index = %name, "Index not found, nothing to delete");
            return Ok(());
        }

        match self
            .call(name, EngineOperation::Delete, self.engine.delete(name.as_str()))
            .await
        {
            Ok(()) => {
                info!(index = %name, "Index deleted");
                Ok(())
            }
            Err(EngineError::IndexNotFound(_)) => {
                warn!(index = %name, "Index disappeared before delete");
                Ok(())
            }
            Err(e) => Err(ProvisionError::from_engine(name, EngineOperation::Delete, e)),
        }
    }

    /// Create an empty, open index.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - If the index was created
    /// * `Err(ProvisionError::AlreadyExists)` - If the index already exists
    #[instrument(skip_all, fields(index = %name))]
    pub async fn create(&self, name: &IndexName) -> Result<(), ProvisionError> {
        self.run(name, EngineOperation::Create, self.engine.create(name.as_str()))
            .await?;
        info!(index = %name, "Index created");
        Ok(())
    }

    /// Define one normalizer on the index.
    ///
    /// See [`IndexProvisioner::apply_normalizers`].
    pub async fn apply_normalizer(
        &self,
        name: &IndexName,
        normalizer: &NormalizerSpec,
    ) -> Result<(), ProvisionError> {
        self.apply_normalizers(name, std::slice::from_ref(normalizer))
            .await
    }

    /// Define normalizers on the index in a single close, settings, reopen cycle.
    ///
    /// An index that is already closed (for example after an earlier
    /// `PartialConfiguration` failure) skips the close and resumes from the
    /// settings update. With no normalizers, an open index is left alone and a
    /// closed one is only reopened.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - If the settings were applied and the index is open again
    /// * `Err(ProvisionError::InvalidState)` - If the index does not exist
    /// * `Err(ProvisionError::PartialConfiguration)` - If the settings update or
    ///   the reopen failed; the index is left closed
    /// * `Err(ProvisionError::Transport)` - If the status check or the close failed;
    ///   the index is unchanged
    #[instrument(skip_all, fields(index = %name, count = normalizers.len()))]
    pub async fn apply_normalizers(
        &self,
        name: &IndexName,
        normalizers: &[NormalizerSpec],
    ) -> Result<(), ProvisionError> {
        match self.status(name).await? {
            IndexLifecycleState::Absent => {
                return Err(ProvisionError::invalid_state(
                    name,
                    EngineOperation::Close,
                    IndexLifecycleState::Absent,
                ));
            }
            IndexLifecycleState::Open if normalizers.is_empty() => {
                debug!(index = %name, "No normalizers to apply");
                return Ok(());
            }
            IndexLifecycleState::Open => {
                self.run(name, EngineOperation::Close, self.engine.close(name.as_str()))
                    .await?;
                debug!(index = %name, "Index closed for settings update");
            }
            IndexLifecycleState::Closed => {
                info!(index = %name, "Index already closed, resuming settings update");
            }
        }

        if !normalizers.is_empty() {
            self.call(
                name,
                EngineOperation::PutSettings,
                self.engine.put_settings(name.as_str(), normalizers),
            )
            .await
            .map_err(|e| {
                warn!(index = %name, error = %e, "Settings update failed, index left closed");
                ProvisionError::left_closed(name, EngineOperation::PutSettings, &e)
            })?;
        }

        self.call(name, EngineOperation::Open, self.engine.open(name.as_str()))
            .await
            .map_err(|e| {
                warn!(index = %name, error = %e, "Reopen failed, index left closed");
                ProvisionError::left_closed(name, EngineOperation::Open, &e)
            })?;

        if normalizers.is_empty() {
            info!(index = %name, "Closed index reopened");
        } else {
            info!(
                index = %name,
                normalizers = ?normalizers.iter().map(|n| n.name.as_str()).collect::<Vec<_>>(),
                "Normalizers applied"
            );
        }
        Ok(())
    }

    /// Apply a field mapping to an open index.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - If the mapping was applied
    /// * `Err(ProvisionError::InvalidState)` - If the index is absent or closed
    /// * `Err(ProvisionError::UnknownNormalizer)` - If a field references a
    ///   normalizer the index does not define
    #[instrument(skip_all, fields(index = %name, fields = mapping.properties.len()))]
    pub async fn apply_mapping(
        &self,
        name: &IndexName,
        mapping: &FieldMapping,
    ) -> Result<(), ProvisionError> {
        let result = self
            .run(
                name,
                EngineOperation::PutMapping,
                self.engine.put_mapping(name.as_str(), mapping),
            )
            .await;

        match result {
            Ok(()) => {
                info!(index = %name, "Mapping applied");
                Ok(())
            }
            Err(ProvisionError::UnknownNormalizer {
                index,
                normalizer,
                field: None,
            }) => {
                let field = mapping
                    .normalizer_references()
                    .into_iter()
                    .find(|(_, n)| *n == normalizer)
                    .map(|(path, _)| path);
                Err(ProvisionError::UnknownNormalizer {
                    index,
                    normalizer,
                    field,
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Ensure the index exists with the given schema.
    ///
    /// With `reset`, any existing index and its documents are deleted first.
    /// Without it, an existing index keeps its documents and only receives the
    /// schema. Normalizers are always applied before the mapping, and a schema
    /// without normalizers skips the close and reopen.
    ///
    /// The schema is validated before any remote call, so an inconsistent
    /// schema never causes a destructive reset.
    ///
    /// # Arguments
    ///
    /// * `lease` - Exclusive lease on the index, from `IndexLocks`
    /// * `schema` - Desired normalizers and mapping
    /// * `reset` - Delete and recreate the index
    ///
    /// # Returns
    ///
    /// * `Ok(IndexHandle)` - The index is open and configured
    /// * `Err(ProvisionError)` - The first step that failed
    #[instrument(skip_all, fields(index = %lease.name(), reset = reset))]
    pub async fn ensure_index(
        &self,
        lease: &IndexLease,
        schema: &Schema,
        reset: bool,
    ) -> Result<IndexHandle, ProvisionError> {
        let name = lease.name();
        schema.validate(name)?;

        if reset {
            self.delete(name).await?;
            self.create(name).await?;
        } else if !self.exists(name).await? {
            self.create(name).await?;
        } else {
            info!(index = %name, "Index exists, keeping documents");
        }

        self.apply_normalizers(name, &schema.normalizers).await?;
        self.apply_mapping(name, &schema.mapping).await?;

        info!(index = %name, "Index ready");
        Ok(IndexHandle::new(name.clone()))
    }
}
