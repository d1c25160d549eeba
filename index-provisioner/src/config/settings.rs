//! Settings read from environment variables.

use std::env;
use std::time::Duration;

use tracing::warn;

use crate::config::ConnectionMode;
use crate::AppError;
use index_provisioner_repository::opensearch::TODOS_INDEX;
use index_provisioner_repository::IndexName;

/// Default OpenSearch URL.
const DEFAULT_OPENSEARCH_URL: &str = "http://localhost:9200";

/// Default connection retry interval in seconds.
const DEFAULT_RETRY_INTERVAL_SECS: u64 = 15;

/// Default request timeout in seconds.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Startup settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub opensearch_url: String,
    /// Basic auth username and password.
    pub credentials: Option<(String, String)>,
    pub index_name: IndexName,
    /// Delete and recreate the index on startup.
    pub reset_index: bool,
    pub connection_mode: ConnectionMode,
    pub retry_interval: Duration,
    /// `None` disables the per-request deadline.
    pub request_timeout: Option<Duration>,
    pub refresh_on_write: bool,
}

impl Settings {
    /// Read settings from the process environment.
    ///
    /// # Environment Variables
    ///
    /// - `OPENSEARCH_URL`: OpenSearch server URL (default: http://localhost:9200)
    /// - `OPENSEARCH_USER` / `OPENSEARCH_PASS`: Basic auth credentials (default: no auth)
    /// - `TODOS_INDEX`: Index name (default: "todos")
    /// - `RESET_INDEX`: Delete and recreate the index on startup (default: true)
    /// - `OPENSEARCH_CONNECTION_MODE`: Connection mode - "fail-fast" or "retry" (default: retry)
    /// - `OPENSEARCH_RETRY_INTERVAL_SECS`: Retry interval in seconds (default: 15)
    /// - `OPENSEARCH_REQUEST_TIMEOUT_SECS`: Per-request deadline, 0 disables it (default: 30)
    /// - `OPENSEARCH_REFRESH_ON_WRITE`: Make writes searchable before returning (default: true)
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read settings through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let opensearch_url =
            lookup("OPENSEARCH_URL").unwrap_or_else(|| DEFAULT_OPENSEARCH_URL.to_string());

        let credentials = match (lookup("OPENSEARCH_USER"), lookup("OPENSEARCH_PASS")) {
            (Some(user), Some(pass)) => Some((user, pass)),
            (None, None) => None,
            _ => {
                return Err(AppError::config(
                    "OPENSEARCH_USER and OPENSEARCH_PASS must be set together",
                ))
            }
        };

        let index_name = IndexName::new(
            lookup("TODOS_INDEX").unwrap_or_else(|| TODOS_INDEX.to_string()),
        )
        .map_err(|e| AppError::config(format!("Invalid TODOS_INDEX: {}", e)))?;

        let connection_mode = ConnectionMode::parse(lookup("OPENSEARCH_CONNECTION_MODE").as_deref());

        let retry_interval = lookup("OPENSEARCH_RETRY_INTERVAL_SECS")
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_RETRY_INTERVAL_SECS);

        let request_timeout = lookup("OPENSEARCH_REQUEST_TIMEOUT_SECS")
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);

        Ok(Self {
            opensearch_url,
            credentials,
            index_name,
            reset_index: parse_flag("RESET_INDEX", lookup("RESET_INDEX"), true),
            connection_mode,
            retry_interval: Duration::from_secs(retry_interval),
            request_timeout: (request_timeout > 0).then(|| Duration::from_secs(request_timeout)),
            refresh_on_write: parse_flag(
                "OPENSEARCH_REFRESH_ON_WRITE",
                lookup("OPENSEARCH_REFRESH_ON_WRITE"),
                true,
            ),
        })
    }
}

fn parse_flag(key: &str, value: Option<String>, default: bool) -> bool {
    let Some(value) = value else {
        return default;
    };

    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => true,
        "false" | "0" | "no" => false,
        _ => {
            warn!(variable = key, value = %value, default = default, "Invalid boolean, using default");
            default
        }
    }
}
