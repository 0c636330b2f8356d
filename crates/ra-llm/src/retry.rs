//! Bounded retry with linear backoff for transport failures.

use std::future::Future;
use std::time::Duration;

use crate::generator::GenerateError;

/// Delay before retry attempt `attempt` (1-based): 1.5 s × attempt number.
pub fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_millis(1500 * u64::from(attempt))
}

/// Run `operation` up to `max_retries + 1` times.
///
/// Only retryable errors (timeouts, connection failures) trigger another
/// attempt; an error response carrying a status code is surfaced
/// immediately. The backoff between attempts is [`backoff_delay`].
pub async fn with_retries<F, Fut, T>(max_retries: u32, mut operation: F) -> Result<T, GenerateError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, GenerateError>>,
{
    let mut attempt = 0;
    loop {
        match operation(attempt + 1).await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt < max_retries => {
                attempt += 1;
                tracing::warn!(attempt, error = %err, "transport failure, retrying");
                tokio::time::sleep(backoff_delay(attempt)).await;
            }
            Err(err) => return Err(err),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn backoff_grows_linearly() {
        assert_eq!(backoff_delay(1), Duration::from_millis(1500));
        assert_eq!(backoff_delay(2), Duration::from_millis(3000));
        assert_eq!(backoff_delay(3), Duration::from_millis(4500));
    }

    #[tokio::test(start_paused = true)]
    async fn retries_transport_failures_up_to_bound() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_retries(2, |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(GenerateError::Timeout) }
        })
        .await;

        assert!(matches!(result.unwrap_err(), GenerateError::Timeout));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_after_transient_failure() {
        let calls = AtomicU32::new(0);
        let result = with_retries(2, |attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt < 2 {
                    Err(GenerateError::Network("refused".into()))
                } else {
                    Ok("done")
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn api_errors_are_never_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_retries(2, |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err(GenerateError::Api {
                    status: 500,
                    message: "server error".into(),
                })
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
