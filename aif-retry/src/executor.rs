use aif_core::AifError;
use aif_telemetry::{Instrument, debug, error, retry_span, warn};
use std::{fmt::Display, future::Future, sync::Arc, time::Duration};
use tokio_util::sync::CancellationToken;

use crate::{
    backoff::compute_backoff,
    classify::Classify,
    observer::{RetryEvent, RetryObserver},
    policy::RetryPolicy,
    sleeper::{BlockingSleeper, SleepOutcome, Sleeper, TokioSleeper},
};

/// Marker for a retry sequence stopped by its cancellation token.
///
/// Error types used with the executor convert from it; for [`AifError`] this
/// is [`AifError::Cancelled`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("operation cancelled")]
pub struct Cancelled;

impl From<Cancelled> for AifError {
    fn from(_: Cancelled) -> Self {
        AifError::Cancelled
    }
}

/// Runs a unit of work under a [`RetryPolicy`].
///
/// ```no_run
/// # use aif_retry::{RetryExecutor, RetryPolicy};
/// # use aif_core::AifError;
/// # async fn demo() -> Result<(), AifError> {
/// let version = RetryExecutor::new(RetryPolicy::database())
///     .named("get_agent_version")
///     .run(|| async { Ok::<_, AifError>(3) })
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct RetryExecutor {
    policy: RetryPolicy,
    operation: String,
    observer: Option<Arc<dyn RetryObserver>>,
    cancellation: Option<CancellationToken>,
}

impl std::fmt::Debug for RetryExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryExecutor")
            .field("policy", &self.policy)
            .field("operation", &self.operation)
            .field("has_observer", &self.observer.is_some())
            .field("cancellation", &self.cancellation)
            .finish()
    }
}

impl RetryExecutor {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy, operation: "operation".to_string(), observer: None, cancellation: None }
    }

    /// Name used in log events and observer notifications.
    #[must_use]
    pub fn named(mut self, operation: impl Into<String>) -> Self {
        self.operation = operation.into();
        self
    }

    #[must_use]
    pub fn with_observer(mut self, observer: impl RetryObserver + 'static) -> Self {
        self.observer = Some(Arc::new(observer));
        self
    }

    #[must_use]
    pub fn with_shared_observer(mut self, observer: Arc<dyn RetryObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn operation_name(&self) -> &str {
        &self.operation
    }

    /// Retry `operation`, waiting on the tokio timer between attempts.
    pub async fn run<T, E, Op, Fut>(&self, operation: Op) -> Result<T, E>
    where
        Op: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Classify + From<Cancelled> + Display,
    {
        self.run_with(&TokioSleeper, operation).await
    }

    /// Retry a synchronous `operation`, blocking the current thread between attempts.
    ///
    /// Must not be called from inside an async runtime worker.
    pub fn run_blocking<T, E, Op>(&self, mut operation: Op) -> Result<T, E>
    where
        Op: FnMut() -> Result<T, E>,
        E: Classify + From<Cancelled> + Display,
    {
        let sleeper = BlockingSleeper::default();
        futures::executor::block_on(
            self.run_with(&sleeper, || std::future::ready(operation())),
        )
    }

    /// The retry loop, parameterized by how it waits.
    ///
    /// The operation is invoked at most `max_attempts` times (a zero policy
    /// value is treated as one). A fatal failure, or the failure of the last
    /// attempt, is returned unchanged and without waiting.
    pub async fn run_with<T, E, Op, Fut, S>(&self, sleeper: &S, mut operation: Op) -> Result<T, E>
    where
        Op: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Classify + From<Cancelled> + Display,
        S: Sleeper,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let span = retry_span(&self.operation, max_attempts);

        async move {
            let mut attempt: u32 = 0;

            loop {
                if self.is_cancelled() {
                    debug!(operation = %self.operation, attempt, "cancelled before attempt");
                    return Err(E::from(Cancelled));
                }
                attempt += 1;

                let failure = match operation().await {
                    Ok(value) => {
                        if attempt > 1 {
                            debug!(operation = %self.operation, attempt, "succeeded after retry");
                        }
                        return Ok(value);
                    }
                    Err(failure) => failure,
                };

                let kind = failure.failure_kind();
                if !failure.verdict(&self.policy).is_retryable() {
                    debug!(
                        operation = %self.operation,
                        attempt,
                        failure.kind = %kind,
                        error = %failure,
                        "non-retryable failure"
                    );
                    return Err(failure);
                }

                if attempt >= max_attempts {
                    error!(
                        operation = %self.operation,
                        attempts = attempt,
                        failure.kind = %kind,
                        error = %failure,
                        "retries exhausted"
                    );
                    return Err(failure);
                }

                let wait = self.wait_after(attempt, &failure);
                let message = failure.to_string();
                warn!(
                    operation = %self.operation,
                    attempt,
                    max_attempts,
                    wait_ms = wait.as_millis() as u64,
                    failure.kind = %kind,
                    error = %message,
                    "retryable failure; backing off"
                );
                if let Some(observer) = &self.observer {
                    observer.on_retry(&RetryEvent::new(
                        &self.operation,
                        attempt,
                        max_attempts,
                        wait,
                        kind,
                        &message,
                    ));
                }

                if sleeper.sleep(wait, self.cancellation.as_ref()).await == SleepOutcome::Cancelled
                {
                    warn!(operation = %self.operation, attempt, "retry wait cancelled");
                    return Err(E::from(Cancelled));
                }
            }
        }
        .instrument(span)
        .await
    }

    fn is_cancelled(&self) -> bool {
        self.cancellation.as_ref().is_some_and(CancellationToken::is_cancelled)
    }

    fn wait_after<E: Classify>(&self, attempt: u32, failure: &E) -> Duration {
        let backoff = compute_backoff(attempt, &self.policy);
        match failure.retry_after() {
            Some(hint) => backoff.max(hint.min(self.policy.max_wait)),
            None => backoff,
        }
    }
}

/// Retry an async `operation` under `policy`.
pub async fn execute_with_retry<T, E, Op, Fut>(policy: &RetryPolicy, operation: Op) -> Result<T, E>
where
    Op: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Classify + From<Cancelled> + Display,
{
    RetryExecutor::new(policy.clone()).run(operation).await
}

/// Retry a synchronous `operation` under `policy`, blocking between attempts.
pub fn execute_with_retry_blocking<T, E, Op>(policy: &RetryPolicy, operation: Op) -> Result<T, E>
where
    Op: FnMut() -> Result<T, E>,
    E: Classify + From<Cancelled> + Display,
{
    RetryExecutor::new(policy.clone()).run_blocking(operation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    };

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::default()
            .with_max_attempts(max_attempts)
            .with_initial_wait(Duration::from_millis(100))
            .with_max_wait(Duration::from_millis(100))
            .with_jitter(false)
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_until_success() {
        let attempts = Arc::new(AtomicU32::new(0));

        let result = execute_with_retry(&fast_policy(3), || {
            let attempts = Arc::clone(&attempts);
            async move {
                let attempt = attempts.fetch_add(1, Ordering::SeqCst);
                if attempt < 2 {
                    return Err(AifError::rate_limit("HTTP 429"));
                }
                Ok("ok")
            }
        })
        .await
        .expect("operation should succeed after retries");

        assert_eq!(result, "ok");
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_on_fatal_error() {
        let attempts = Arc::new(AtomicU32::new(0));

        let error = execute_with_retry(&fast_policy(5), || {
            let attempts = Arc::clone(&attempts);
            async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(AifError::database("DB005", "duplicate key"))
            }
        })
        .await
        .expect_err("operation should fail without retries");

        assert_eq!(error, AifError::database("DB005", "duplicate key"));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_after_hint_extends_wait() {
        let policy = fast_policy(2).with_max_wait(Duration::from_secs(10));
        let attempts = Arc::new(AtomicU32::new(0));
        let start = tokio::time::Instant::now();

        let _ = execute_with_retry(&policy, || {
            let attempts = Arc::clone(&attempts);
            async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(AifError::RateLimit {
                    message: "slow down".into(),
                    retry_after: Some(Duration::from_secs(60)),
                })
            }
        })
        .await;

        let elapsed = start.elapsed();
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
        assert!(elapsed >= Duration::from_secs(10), "waited {elapsed:?}");
        assert!(elapsed < Duration::from_secs(60), "hint not capped: {elapsed:?}");
    }

    #[tokio::test]
    async fn test_pre_cancelled_token_skips_operation() {
        let token = CancellationToken::new();
        token.cancel();
        let attempts = AtomicU32::new(0);

        let error = RetryExecutor::new(fast_policy(3))
            .with_cancellation(token)
            .run(|| {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Ok::<_, AifError>(()) }
            })
            .await
            .expect_err("cancelled executor should not run");

        assert_eq!(error, AifError::Cancelled);
        assert_eq!(attempts.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_executor_builder() {
        let executor = RetryExecutor::new(RetryPolicy::judge()).named("judge.call");
        assert_eq!(executor.operation_name(), "judge.call");
        assert_eq!(executor.policy().max_attempts, 6);
        assert!(format!("{executor:?}").contains("judge.call"));
    }
}
