//! Capped-exponential-backoff retry loop for remote-API tasks (`spec.md`
//! §4.1: "base 1 s, factor 2, cap = per-service timeout, max `maxAPIRetries`
//! attempts"; §5: "retry loops must honour cancellation between attempts and
//! during backoff waits").

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::LangkitError;

const BASE_DELAY: Duration = Duration::from_secs(1);
const BACKOFF_FACTOR: u32 = 2;

/// Runs `attempt` up to `max_attempts` times, retrying only
/// [`LangkitError::is_retryable`] failures with capped exponential backoff
/// between attempts. Non-retryable errors and cancellation both return
/// immediately.
pub async fn with_retry<F, Fut, T>(
    cancel: &CancellationToken,
    max_attempts: u32,
    cap: Duration,
    mut attempt: F,
) -> Result<T, LangkitError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, LangkitError>>,
{
    let mut delay = BASE_DELAY.min(cap);
    let mut tries = 0u32;
    loop {
        tries += 1;
        if cancel.is_cancelled() {
            return Err(LangkitError::UserCancel);
        }
        match attempt().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && tries < max_attempts => {
                tokio::select! {
                    _ = cancel.cancelled() => return Err(LangkitError::UserCancel),
                    _ = tokio::time::sleep(delay) => {}
                }
                delay = (delay * BACKOFF_FACTOR).min(cap);
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let cancel = CancellationToken::new();
        let calls = AtomicU32::new(0);
        let result = with_retry(&cancel, 5, Duration::from_millis(10), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(LangkitError::TransientRemote {
                        provider: "x".into(),
                        message: "503".into(),
                    })
                } else {
                    Ok(42)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn permanent_errors_are_not_retried() {
        let cancel = CancellationToken::new();
        let calls = AtomicU32::new(0);
        let result: Result<(), LangkitError> = with_retry(&cancel, 5, Duration::from_millis(10), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                Err(LangkitError::PermanentRemote {
                    provider: "x".into(),
                    message: "401".into(),
                })
            }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cancellation_stops_retry_loop() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result: Result<(), LangkitError> =
            with_retry(&cancel, 5, Duration::from_millis(10), || async {
                Err(LangkitError::TransientRemote {
                    provider: "x".into(),
                    message: "503".into(),
                })
            })
            .await;
        assert!(matches!(result, Err(LangkitError::UserCancel)));
    }
}
