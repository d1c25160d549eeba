//! Configuration types for the IndexProvisioner.

use std::time::Duration;

/// Default deadline for a single engine call.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for the IndexProvisioner and SearchIndexService.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionerConfig {
    /// Deadline applied to every remote call.
    ///
    /// Set to `None` to wait indefinitely. Defaults to 30 seconds.
    pub request_timeout: Option<Duration>,
}

impl Default for ProvisionerConfig {
    fn default() -> Self {
        Self {
            request_timeout: Some(DEFAULT_REQUEST_TIMEOUT),
        }
    }
}

impl ProvisionerConfig {
    /// Create a config with no request deadline.
    ///
    /// # Warning
    ///
    /// A hung engine call will then block `EnsureIndex` forever, possibly with
    /// the index closed.
    pub fn without_timeout() -> Self {
        Self {
            request_timeout: None,
        }
    }

    /// Create a config with a custom request deadline.
    pub fn with_request_timeout(request_timeout: Duration) -> Self {
        Self {
            request_timeout: Some(request_timeout),
        }
    }
}
