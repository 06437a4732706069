//! Bounded retry for transient store errors.

use crate::error::StoreError;
use quotagate_core::Clock;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// How many times a transient store error is retried inside one operation.
const TRANSIENT_ATTEMPTS: u32 = 3;

/// Base delay between transient retries; grows linearly per attempt.
const TRANSIENT_BACKOFF: Duration = Duration::from_millis(50);

/// Runs `op`, retrying transient store errors a bounded number of times.
///
/// `ConditionFailed` and fatal errors are returned immediately; a transient
/// error that survives all attempts is surfaced as-is.
pub async fn retry_transient<T, F, Fut>(clock: &Arc<dyn Clock>, mut op: F) -> Result<T, StoreError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StoreError>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Err(StoreError::Transient { message }) if attempt + 1 < TRANSIENT_ATTEMPTS => {
                attempt += 1;
                tracing::debug!(attempt, %message, "retrying transient store error");
                clock.sleep(TRANSIENT_BACKOFF * attempt).await;
            }
            other => return other,
        }
    }
}
