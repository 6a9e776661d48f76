//! Bounded waits for store and queue calls made by request handlers.

use std::future::Future;
use std::time::Duration;

use tokio::time;

use crate::domain::foundation::{DomainError, ErrorCode};

/// Deadline applied to each store call when none is configured.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);

/// Runs a store call, failing with `StoreTimeout` if it outlives `deadline`.
pub(crate) async fn within<T, F>(
    deadline: Duration,
    operation: &'static str,
    call: F,
) -> Result<T, DomainError>
where
    F: Future<Output = Result<T, DomainError>>,
{
    match time::timeout(deadline, call).await {
        Ok(result) => result,
        Err(_) => Err(DomainError::new(
            ErrorCode::StoreTimeout,
            format!("{} exceeded {}ms", operation, deadline.as_millis()),
        )
        .with_detail("operation", operation)),
    }
}
