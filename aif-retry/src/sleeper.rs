//! The suspension primitive the retry loop waits on.
//!
//! One retry algorithm serves both async and blocking callers: only the way
//! it waits between attempts differs.

use std::future::Future;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SleepOutcome {
    Elapsed,
    Cancelled,
}

pub trait Sleeper: Send + Sync {
    /// Wait for `duration`, returning early if `cancel` fires.
    fn sleep(
        &self,
        duration: Duration,
        cancel: Option<&CancellationToken>,
    ) -> impl Future<Output = SleepOutcome> + Send;
}

/// Non-blocking wait on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    fn sleep(
        &self,
        duration: Duration,
        cancel: Option<&CancellationToken>,
    ) -> impl Future<Output = SleepOutcome> + Send {
        async move {
            match cancel {
                Some(token) => tokio::select! {
                    biased;
                    _ = token.cancelled() => SleepOutcome::Cancelled,
                    _ = tokio::time::sleep(duration) => SleepOutcome::Elapsed,
                },
                None => {
                    tokio::time::sleep(duration).await;
                    SleepOutcome::Elapsed
                }
            }
        }
    }
}

/// Thread-blocking wait for synchronous callers.
///
/// Sleeps in short slices so a cancellation is noticed within one slice.
#[derive(Debug, Clone, Copy)]
pub struct BlockingSleeper {
    slice: Duration,
}

impl BlockingSleeper {
    pub fn new(slice: Duration) -> Self {
        Self { slice: slice.max(Duration::from_millis(1)) }
    }

    fn wait(&self, duration: Duration, cancel: Option<&CancellationToken>) -> SleepOutcome {
        // no deadline: the wait outlives any clock, only cancellation ends it
        let deadline = Instant::now().checked_add(duration);
        loop {
            if cancel.is_some_and(CancellationToken::is_cancelled) {
                return SleepOutcome::Cancelled;
            }
            let remaining = deadline
                .map_or(self.slice, |deadline| deadline.saturating_duration_since(Instant::now()));
            if remaining.is_zero() {
                return SleepOutcome::Elapsed;
            }
            std::thread::sleep(remaining.min(self.slice));
        }
    }
}

impl Default for BlockingSleeper {
    fn default() -> Self {
        Self::new(Duration::from_millis(10))
    }
}

impl Sleeper for BlockingSleeper {
    fn sleep(
        &self,
        duration: Duration,
        cancel: Option<&CancellationToken>,
    ) -> impl Future<Output = SleepOutcome> + Send {
        std::future::ready(self.wait(duration, cancel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_tokio_sleeper_elapses() {
        let start = tokio::time::Instant::now();
        let outcome = TokioSleeper.sleep(Duration::from_secs(5), None).await;
        assert_eq!(outcome, SleepOutcome::Elapsed);
        assert!(start.elapsed() >= Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_sleeper_cancels() {
        let token = CancellationToken::new();
        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            canceller.cancel();
        });

        let start = tokio::time::Instant::now();
        let outcome = TokioSleeper.sleep(Duration::from_secs(60), Some(&token)).await;
        assert_eq!(outcome, SleepOutcome::Cancelled);
        assert!(start.elapsed() < Duration::from_secs(60));
    }

    #[test]
    fn test_blocking_sleeper_observes_cancel() {
        let token = CancellationToken::new();
        token.cancel();
        let sleeper = BlockingSleeper::default();
        let started = Instant::now();
        assert_eq!(sleeper.wait(Duration::from_secs(30), Some(&token)), SleepOutcome::Cancelled);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_blocking_sleeper_unbounded_wait_is_cancellable() {
        let token = CancellationToken::new();
        let canceller = token.clone();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(30));
            canceller.cancel();
        });
        let sleeper = BlockingSleeper::new(Duration::from_millis(5));

        assert_eq!(sleeper.wait(Duration::MAX, Some(&token)), SleepOutcome::Cancelled);
        handle.join().unwrap();
    }

    #[test]
    fn test_blocking_sleeper_elapses() {
        let sleeper = BlockingSleeper::new(Duration::from_millis(5));
        let started = Instant::now();
        assert_eq!(sleeper.wait(Duration::from_millis(20), None), SleepOutcome::Elapsed);
        assert!(started.elapsed() >= Duration::from_millis(20));
    }
}
