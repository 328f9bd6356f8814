//! Integration tests for the retry executor state machine.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use aif_core::{AifError, FailureKind};
use aif_retry::{
    CancellationToken, ChannelObserver, RetryEvent, RetryExecutor, RetryPolicy,
    execute_with_retry, execute_with_retry_blocking,
};

fn policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy::default()
        .with_max_attempts(max_attempts)
        .with_initial_wait(Duration::from_secs(1))
        .with_max_wait(Duration::from_secs(30))
        .with_jitter(false)
}

#[tokio::test(start_paused = true)]
async fn always_retryable_operation_runs_max_attempts_and_returns_last_error() {
    let attempts = Arc::new(AtomicU32::new(0));

    let error = execute_with_retry(&policy(3), || {
        let attempts = Arc::clone(&attempts);
        async move {
            let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
            Err::<(), _>(AifError::timeout(format!("attempt {attempt} timed out")))
        }
    })
    .await
    .expect_err("every attempt fails");

    assert_eq!(attempts.load(Ordering::SeqCst), 3);
    assert_eq!(error, AifError::timeout("attempt 3 timed out"));
}

#[tokio::test(start_paused = true)]
async fn last_attempt_does_not_wait() {
    let start = tokio::time::Instant::now();

    let _ = execute_with_retry(&policy(3), || async {
        Err::<(), _>(AifError::database("DB001", "connection refused"))
    })
    .await;

    // 1s after the first failure, 2s after the second, nothing after the third.
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_secs(3), "waited {elapsed:?}");
    assert!(elapsed < Duration::from_secs(4), "waited after the last attempt: {elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn fatal_failure_runs_once_without_waiting() {
    let attempts = AtomicU32::new(0);
    let start = tokio::time::Instant::now();

    let error = execute_with_retry(&policy(5), || {
        attempts.fetch_add(1, Ordering::SeqCst);
        async { Err::<(), _>(AifError::external_service("anthropic", Some(400), "bad request")) }
    })
    .await
    .expect_err("fatal failure surfaces");

    assert_eq!(attempts.load(Ordering::SeqCst), 1);
    assert_eq!(start.elapsed(), Duration::ZERO);
    assert_eq!(error.kind(), FailureKind::ExternalService);
}

#[tokio::test(start_paused = true)]
async fn observer_sees_each_retry() {
    let (observer, mut events) = ChannelObserver::channel();
    let attempts = AtomicU32::new(0);

    let result = RetryExecutor::new(policy(4))
        .named("get_agents_needing_testing")
        .with_observer(observer)
        .run(|| {
            let attempt = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt < 2 {
                    Err(AifError::network("connection reset by peer"))
                } else {
                    Ok(attempt)
                }
            }
        })
        .await;

    assert_eq!(result, Ok(2));

    let mut received: Vec<RetryEvent> = Vec::new();
    while let Ok(event) = events.try_recv() {
        received.push(event);
    }
    assert_eq!(received.len(), 2);
    assert_eq!(received[0].operation, "get_agents_needing_testing");
    assert_eq!(received[0].attempt, 1);
    assert_eq!(received[0].max_attempts, 4);
    assert_eq!(received[0].wait, Duration::from_secs(1));
    assert_eq!(received[0].kind, FailureKind::Network);
    assert!(received[0].message.contains("connection reset"));
    assert_eq!(received[1].attempt, 2);
    assert_eq!(received[1].wait, Duration::from_secs(2));
}

#[tokio::test(start_paused = true)]
async fn cancelling_during_backoff_returns_cancelled_without_another_attempt() {
    let token = CancellationToken::new();
    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(500)).await;
        canceller.cancel();
    });

    let attempts = AtomicU32::new(0);
    let error = RetryExecutor::new(policy(5))
        .with_cancellation(token)
        .run(|| {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(AifError::rate_limit("429 too many requests")) }
        })
        .await
        .expect_err("cancelled");

    assert_eq!(error, AifError::Cancelled);
    assert_eq!(attempts.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn executor_futures_are_send() {
    let executor = RetryExecutor::new(RetryPolicy::no_retry()).named("spawned");
    let handle = tokio::spawn(async move {
        executor.run(|| async { Ok::<_, AifError>("done") }).await
    });
    assert_eq!(handle.await.expect("task joins"), Ok("done"));
}

#[test]
fn blocking_driver_shares_the_algorithm() {
    let policy = RetryPolicy::default()
        .with_max_attempts(3)
        .with_initial_wait(Duration::from_millis(100))
        .with_max_wait(Duration::from_millis(100))
        .with_jitter(false);
    let mut attempts = 0;

    let result = execute_with_retry_blocking(&policy, || {
        attempts += 1;
        if attempts < 3 { Err(AifError::unknown("socket closed")) } else { Ok(attempts) }
    });

    assert_eq!(result, Ok(3));
}

#[test]
fn blocking_driver_honours_cancellation() {
    let token = CancellationToken::new();
    token.cancel();
    let mut attempts = 0;

    let result = RetryExecutor::new(policy(3)).with_cancellation(token).run_blocking(|| {
        attempts += 1;
        Ok::<_, AifError>(())
    });

    assert_eq!(result, Err(AifError::Cancelled));
    assert_eq!(attempts, 0);
}
