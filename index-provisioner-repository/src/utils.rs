//! Utility functions for the index provisioner repository.

use std::future::Future;
use std::time::Duration;

use crate::errors::EngineError;

/// Run an engine call under an optional deadline.
///
/// An elapsed deadline drops the in-flight call and is reported as a
/// transport error, like any other unanswered request.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use index_provisioner_repository::utils::with_deadline;
///
/// # async fn example() {
/// let result = with_deadline(Some(Duration::from_secs(1)), async { Ok(42) }).await;
/// assert_eq!(result, Ok(42));
/// # }
/// ```
pub async fn with_deadline<T, F>(deadline: Option<Duration>, call: F) -> Result<T, EngineError>
where
    F: Future<Output = Result<T, EngineError>>,
{
    match deadline {
        Some(duration) => tokio::time::timeout(duration, call).await.map_err(|_| {
            EngineError::transport(format!("Request timed out after {:?}", duration))
        })?,
        None => call.await,
    }
}
