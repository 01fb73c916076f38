//! Deadline-bound calls

use crate::error::{CloudError, Result};
use std::future::Future;
use std::time::Duration;

/// Run `future` with a deadline of `timeout`. Expiry drops the future, which
/// aborts whatever provider call it was awaiting.
pub async fn within<T, F>(timeout: Duration, future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, future).await {
        Ok(result) => result,
        Err(_) => Err(CloudError::Timeout(format!(
            "deadline of {}s exceeded",
            timeout.as_secs()
        ))),
    }
}
