use aif_core::{AifError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;

use crate::classify::DEFAULT_RETRYABLE_STATUS_CODES;

/// Longest wait a policy may configure between two attempts.
pub const MAX_WAIT_LIMIT: Duration = Duration::from_secs(24 * 60 * 60);

/// How often and how patiently an operation is retried.
///
/// Policies are built once per call site (database access, judge calls, ...)
/// and shared read-only afterwards.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one.
    pub max_attempts: u32,
    #[serde(rename = "initial_wait_secs", with = "secs_f64")]
    pub initial_wait: Duration,
    #[serde(rename = "max_wait_secs", with = "secs_f64")]
    pub max_wait: Duration,
    pub exponential_base: f64,
    #[serde(rename = "jitter")]
    pub jitter_enabled: bool,
    /// HTTP statuses from an external service that are worth another attempt.
    pub retryable_status_codes: BTreeSet<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_wait: Duration::from_secs(1),
            max_wait: Duration::from_secs(30),
            exponential_base: 2.0,
            jitter_enabled: true,
            retryable_status_codes: DEFAULT_RETRYABLE_STATUS_CODES.into_iter().collect(),
        }
    }
}

impl RetryPolicy {
    /// Policy for database reads and writes: many quick attempts.
    #[must_use]
    pub fn database() -> Self {
        Self {
            max_attempts: 5,
            initial_wait: Duration::from_millis(500),
            max_wait: Duration::from_secs(15),
            ..Self::default()
        }
    }

    /// Policy for LLM judge calls, which are expensive and rate limited.
    #[must_use]
    pub fn judge() -> Self {
        Self {
            max_attempts: 6,
            initial_wait: Duration::from_secs(3),
            max_wait: Duration::from_secs(180),
            ..Self::default()
        }
    }

    /// Policy for other third-party HTTP APIs.
    #[must_use]
    pub fn external_api() -> Self {
        Self::default()
    }

    /// A single attempt, no retries.
    #[must_use]
    pub fn no_retry() -> Self {
        Self { max_attempts: 1, ..Self::default() }
    }

    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    #[must_use]
    pub fn with_initial_wait(mut self, initial_wait: Duration) -> Self {
        self.initial_wait = initial_wait;
        self
    }

    #[must_use]
    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait;
        self
    }

    #[must_use]
    pub fn with_exponential_base(mut self, exponential_base: f64) -> Self {
        self.exponential_base = exponential_base;
        self
    }

    #[must_use]
    pub fn with_jitter(mut self, jitter_enabled: bool) -> Self {
        self.jitter_enabled = jitter_enabled;
        self
    }

    #[must_use]
    pub fn with_retryable_status_codes(mut self, codes: impl IntoIterator<Item = u16>) -> Self {
        self.retryable_status_codes = codes.into_iter().collect();
        self
    }

    /// Check the policy bounds.
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(AifError::invalid_field("max_attempts", "max_attempts must be at least 1"));
        }
        if self.initial_wait.is_zero() {
            return Err(AifError::invalid_field(
                "initial_wait_secs",
                "initial_wait must be greater than zero",
            ));
        }
        if self.max_wait < self.initial_wait {
            return Err(AifError::invalid_field(
                "max_wait_secs",
                format!(
                    "max_wait ({:?}) must not be shorter than initial_wait ({:?})",
                    self.max_wait, self.initial_wait
                ),
            ));
        }
        if self.max_wait > MAX_WAIT_LIMIT {
            return Err(AifError::invalid_field(
                "max_wait_secs",
                format!(
                    "max_wait ({:?}) must not exceed {:?}",
                    self.max_wait, MAX_WAIT_LIMIT
                ),
            ));
        }
        if !self.exponential_base.is_finite() || self.exponential_base <= 1.0 {
            return Err(AifError::invalid_field(
                "exponential_base",
                format!("exponential_base must be greater than 1, got {}", self.exponential_base),
            ));
        }
        Ok(())
    }
}

mod secs_f64 {
    use serde::{Deserialize, Deserializer, Serializer, de::Error};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs)
            .map_err(|e| D::Error::custom(format!("invalid duration {secs}: {e}")))
    }
}
