//! Bounded retry of optimistic read-modify-write operations.

use std::future::Future;

use common::{AppError, AppResult};

/// Run `attempt` until it does not fail with `StaleWrite`, at most
/// `max_attempts` times. Each run must re-read the records it writes.
pub(crate) async fn retry_stale<T, F, Fut>(
    operation: &'static str,
    max_attempts: u32,
    mut attempt: F,
) -> AppResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = AppResult<T>>,
{
    let max_attempts = max_attempts.max(1);
    let mut tries = 1;

    loop {
        match attempt().await {
            Err(AppError::StaleWrite) if tries < max_attempts => {
                tracing::debug!(operation, attempt = tries, "Concurrent write detected, retrying");
                tries += 1;
                tokio::task::yield_now().await;
            }
            Err(AppError::StaleWrite) => {
                tracing::warn!(operation, attempts = tries, "Giving up after repeated write conflicts");
                return Err(AppError::StaleWrite);
            }
            outcome => return outcome,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn retries_until_success() {
        let counter = AtomicU32::new(0);
        let calls = &counter;

        let result = retry_stale("test", 5, || async move {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(AppError::StaleWrite)
            } else {
                Ok(7)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let counter = AtomicU32::new(0);
        let calls = &counter;

        let result: AppResult<()> = retry_stale("test", 3, || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(AppError::StaleWrite)
        })
        .await;

        assert!(matches!(result, Err(AppError::StaleWrite)));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn other_errors_are_not_retried() {
        let counter = AtomicU32::new(0);
        let calls = &counter;

        let result: AppResult<()> = retry_stale("test", 3, || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(AppError::AlreadyReleased)
        })
        .await;

        assert!(matches!(result, Err(AppError::AlreadyReleased)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
