// Retry utilities
// Used only around whole jobs; the thinking loop itself never retries a call.

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

/// Run `operation` up to `max_attempts` times with exponential backoff
/// starting at `base_delay` (doubling, capped at 2^5).
pub async fn with_retry<F, Fut, T, E>(operation: F, max_attempts: u32, base_delay: Duration) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    with_retry_when(operation, |_| true, max_attempts, base_delay).await
}

/// Like [`with_retry`], but gives up at once on errors `retryable` rejects
pub async fn with_retry_when<F, Fut, T, E, P>(
    mut operation: F,
    retryable: P,
    max_attempts: u32,
    base_delay: Duration,
) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    P: Fn(&E) -> bool,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        match operation(attempt).await {
            Ok(result) => return Ok(result),
            Err(error) => {
                if attempt >= max_attempts || !retryable(&error) {
                    return Err(error);
                }

                let delay = base_delay * 2u32.pow((attempt - 1).min(5));
                warn!(attempt, max_attempts, error = %error, delay_ms = delay.as_millis() as u64, "Attempt failed, retrying");
                sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_retries_until_success() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, String> = with_retry(
            |attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt < 3 {
                        Err(format!("attempt {} failed", attempt))
                    } else {
                        Ok(attempt)
                    }
                }
            },
            5,
            Duration::from_millis(1),
        )
        .await;

        assert_eq!(result, Ok(3));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let result: Result<(), String> =
            with_retry(|_| async { Err("down".to_string()) }, 2, Duration::from_millis(1)).await;
        tokio_test::assert_err!(result);
    }

    #[tokio::test]
    async fn test_permanent_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), String> = with_retry_when(
            |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err("bad input".to_string()) }
            },
            |e: &String| !e.starts_with("bad"),
            5,
            Duration::from_millis(1),
        )
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
