use std::future::Future;
use std::time::Duration;

use crate::error::EventError;

/// Bound an infrastructure call by `limit`; an elapsed deadline becomes
/// `EventError::Timeout` naming `operation`.
pub async fn with_timeout<F, T>(operation: &'static str, limit: Duration, fut: F) -> Result<T, EventError>
where
    F: Future<Output = Result<T, EventError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(
                operation = operation,
                timeout_ms = limit.as_millis() as u64,
                "Operation timed out"
            );
            Err(EventError::Timeout {
                operation,
                timeout_ms: limit.as_millis() as u64,
            })
        }
    }
}
