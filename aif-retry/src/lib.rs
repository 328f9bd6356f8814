//! # aif-retry
//!
//! Resilient calls for the agent-testing backend.
//!
//! Every unreliable external call (database queries, judge invocations) is
//! wrapped by a [`RetryExecutor`] configured with a [`RetryPolicy`]. Failures
//! are classified into retryable and fatal, retryable ones are retried after
//! an exponential, jittered backoff.
//!
//! ```no_run
//! use aif_core::AifError;
//! use aif_retry::{RetryPolicy, execute_with_retry};
//!
//! # async fn demo() -> Result<(), AifError> {
//! let rows = execute_with_retry(&RetryPolicy::database(), || async {
//!     Ok::<_, AifError>(vec!["agent-1"])
//! })
//! .await?;
//! # Ok(())
//! # }
//! ```

pub mod backoff;
pub mod classify;
pub mod executor;
pub mod observer;
pub mod policy;
pub mod sleeper;

pub use backoff::{JITTER_RATIO, MIN_BACKOFF, base_backoff, compute_backoff, compute_backoff_with};
pub use classify::{
    Classify, DEFAULT_RETRYABLE_STATUS_CODES, NETWORK_KEYWORDS, Verdict, classify,
    classify_with_policy, is_network_message, is_retryable_status_code,
};
pub use executor::{Cancelled, RetryExecutor, execute_with_retry, execute_with_retry_blocking};
pub use observer::{ChannelObserver, RetryEvent, RetryObserver};
pub use policy::{MAX_WAIT_LIMIT, RetryPolicy};
pub use sleeper::{BlockingSleeper, SleepOutcome, Sleeper, TokioSleeper};

pub use tokio_util::sync::CancellationToken;
