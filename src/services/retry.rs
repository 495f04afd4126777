//! Bounded retry with linear backoff
//!
//! Timing goes through [`Delay`] so the schedule can be driven without real
//! sleeps.

use crate::config::RetrySettings;
use crate::error::{InsightError, Result};
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Suspension point for backoff and throttle waits
#[async_trait]
pub trait Delay: Send + Sync {
    async fn wait(&self, duration: Duration);
}

/// Real-time delay backed by the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioDelay;

#[async_trait]
impl Delay for TokioDelay {
    async fn wait(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Attempt budget and backoff step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff_step: Duration,
}

impl RetryPolicy {
    /// Backoff before the attempt following `attempt` (1-based)
    pub fn backoff_after(&self, attempt: u32) -> Duration {
        self.backoff_step * attempt
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetrySettings::default())
    }
}

impl From<&RetrySettings> for RetryPolicy {
    fn from(settings: &RetrySettings) -> Self {
        Self {
            max_attempts: settings.max_attempts.max(1),
            backoff_step: Duration::from_millis(settings.backoff_step_ms),
        }
    }
}

/// Run `operation` until it succeeds, fails permanently, or the attempt
/// budget is spent
///
/// Throttling that outlasts the budget is reported as a network failure.
pub async fn retry_request<T, F, Fut>(
    policy: &RetryPolicy,
    delay: &dyn Delay,
    what: &str,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if !e.is_retryable() => return Err(e),
            Err(e) if attempt >= policy.max_attempts => {
                return Err(match e {
                    InsightError::RateLimited(message) => InsightError::NetworkFailure {
                        status: Some(429),
                        message: format!("{} still throttled after {} attempts: {}", what, attempt, message),
                    },
                    other => other,
                });
            }
            Err(e) => {
                let backoff = policy.backoff_after(attempt);
                warn!(
                    "{} failed, retrying after {:?} (attempt {}/{}): {}",
                    what, backoff, attempt, policy.max_attempts, e
                );
                delay.wait(backoff).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingDelay {
        waits: Mutex<Vec<Duration>>,
    }

    #[async_trait]
    impl Delay for RecordingDelay {
        async fn wait(&self, duration: Duration) {
            self.waits.lock().unwrap().push(duration);
        }
    }

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            backoff_step: Duration::from_millis(800),
        }
    }

    #[tokio::test]
    async fn test_success_first_try() {
        let delay = RecordingDelay::default();
        let result = retry_request(&policy(), &delay, "page", || async { Ok(7) }).await;
        assert_eq!(result.unwrap(), 7);
        assert!(delay.waits.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rate_limit_backs_off_linearly_then_fails() {
        let delay = RecordingDelay::default();
        let calls = AtomicU32::new(0);
        let result: Result<()> = retry_request(&policy(), &delay, "page", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(InsightError::RateLimited("slow down".into())) }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(
            *delay.waits.lock().unwrap(),
            vec![Duration::from_millis(800), Duration::from_millis(1600)]
        );
        assert!(matches!(
            result,
            Err(InsightError::NetworkFailure {
                status: Some(429),
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_recovers_after_server_error() {
        let delay = RecordingDelay::default();
        let calls = AtomicU32::new(0);
        let result = retry_request(&policy(), &delay, "list", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(InsightError::NetworkFailure {
                        status: Some(503),
                        message: "unavailable".into(),
                    })
                } else {
                    Ok("ok")
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "ok");
        assert_eq!(delay.waits.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let delay = RecordingDelay::default();
        let calls = AtomicU32::new(0);
        let result: Result<()> = retry_request(&policy(), &delay, "list", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err(InsightError::NetworkFailure {
                    status: Some(404),
                    message: "missing".into(),
                })
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(delay.waits.lock().unwrap().is_empty());
    }

    #[test]
    fn test_policy_from_settings_never_zero_attempts() {
        let policy = RetryPolicy::from(&RetrySettings {
            max_attempts: 0,
            backoff_step_ms: 5,
        });
        assert_eq!(policy.max_attempts, 1);
        assert_eq!(policy.backoff_after(2), Duration::from_millis(10));
    }
}
