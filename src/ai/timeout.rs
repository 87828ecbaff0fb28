//! Timeout Helper
//!
//! Wraps an async operation with `tokio::time::timeout` and maps expiry to
//! [`WeaveError::Timeout`], which the retry wrapper treats as retryable.

use std::future::Future;
use std::time::Duration;

use crate::types::{Result, WeaveError};

/// Execute an async operation with a timeout
///
/// # Example
///
/// ```ignore
/// let result = with_timeout(
///     Duration::from_secs(30),
///     async { provider.complete(&prompt).await },
///     "LLM completion"
/// ).await?;
/// ```
pub async fn with_timeout<T, F>(timeout: Duration, future: F, operation_name: &str) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, future).await {
        Ok(result) => result,
        Err(_) => Err(WeaveError::timeout(operation_name, timeout)),
    }
}
