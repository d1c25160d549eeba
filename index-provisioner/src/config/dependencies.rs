//! Dependency initialization and wiring for the index provisioner.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::config::Settings;
use crate::AppError;
use index_provisioner_repository::{
    IndexLocks, OpenSearchConfig, OpenSearchEngine, ProvisionerConfig, SearchEngineClient,
    SearchIndexService,
};

/// Connection mode for OpenSearch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionMode {
    /// Fail immediately if connection fails.
    FailFast,
    /// Retry the connection at a fixed interval until it succeeds.
    Retry,
}

impl ConnectionMode {
    /// Parse the connection mode from the `OPENSEARCH_CONNECTION_MODE` value.
    ///
    /// Valid values: "fail-fast" or "retry" (case-insensitive)
    /// Defaults to "retry" if not set or invalid.
    pub fn parse(value: Option<&str>) -> Self {
        match value.unwrap_or("retry").to_lowercase().as_str() {
            "fail-fast" | "failfast" | "fail_fast" => Self::FailFast,
            "retry" => Self::Retry,
            _ => {
                warn!("Invalid OPENSEARCH_CONNECTION_MODE, defaulting to 'retry'");
                Self::Retry
            }
        }
    }
}

/// Container for all initialized dependencies.
pub struct Dependencies {
    /// Document and lifecycle operations against OpenSearch.
    pub service: SearchIndexService,
    /// Leases serialising `ensure_index` per index.
    pub locks: IndexLocks,
    /// The settings the dependencies were built from.
    pub settings: Settings,
}

impl Dependencies {
    /// Initialize all dependencies from the given settings.
    ///
    /// Waits for OpenSearch to answer a ping according to the connection
    /// mode. The index itself is not touched here.
    ///
    /// # Returns
    ///
    /// * `Ok(Dependencies)` - Initialized dependencies
    /// * `Err(AppError)` - If initialization fails (only in fail-fast mode)
    pub async fn new(settings: Settings) -> Result<Self, AppError> {
        info!(
            opensearch_url = %settings.opensearch_url,
            basic_auth = settings.credentials.is_some(),
            index = %settings.index_name,
            reset_index = settings.reset_index,
            connection_mode = ?settings.connection_mode,
            retry_interval_secs = settings.retry_interval.as_secs(),
            request_timeout = ?settings.request_timeout,
            "Initializing dependencies"
        );

        let mut engine_config = OpenSearchConfig::new(settings.opensearch_url.clone())
            .with_refresh_on_write(settings.refresh_on_write);
        if let Some((username, password)) = settings.credentials.clone() {
            engine_config = engine_config.with_basic_auth(username, password);
        }

        let engine = OpenSearchEngine::new(engine_config)
            .await
            .map_err(|e| AppError::config(format!("Failed to create OpenSearch client: {}", e)))?;

        wait_for_engine(
            &engine,
            &settings.opensearch_url,
            settings.connection_mode,
            settings.retry_interval,
        )
        .await?;

        info!("OpenSearch connection established");

        let provisioner_config = ProvisionerConfig {
            request_timeout: settings.request_timeout,
        };
        let service = SearchIndexService::with_config(Arc::new(engine), provisioner_config);

        Ok(Self {
            service,
            locks: IndexLocks::new(),
            settings,
        })
    }
}

/// Ping the engine until it answers, according to the connection mode.
pub async fn wait_for_engine(
    engine: &dyn SearchEngineClient,
    url: &str,
    mode: ConnectionMode,
    retry_interval: Duration,
) -> Result<(), AppError> {
    loop {
        let error = match engine.ping().await {
            Ok(true) => return Ok(()),
            Ok(false) => "ping was not acknowledged".to_string(),
            Err(e) => e.to_string(),
        };

        match mode {
            ConnectionMode::FailFast => {
                return Err(AppError::config(format!(
                    "Failed to connect to OpenSearch: {}",
                    error
                )));
            }
            ConnectionMode::Retry => {
                warn!(
                    opensearch_url = %url,
                    error = %error,
                    retry_interval_secs = retry_interval.as_secs(),
                    "Failed to connect to OpenSearch, retrying..."
                );
                sleep(retry_interval).await;
            }
        }
    }
}
