//! Failure classification: is another attempt worth it?

use aif_core::{AifError, FailureKind, db_codes};
use std::time::Duration;

use crate::policy::RetryPolicy;

/// Statuses that indicate a transient problem on the other side.
pub const DEFAULT_RETRYABLE_STATUS_CODES: [u16; 5] = [429, 500, 502, 503, 504];

/// Message fragments that mark an otherwise unclassified failure as a network problem.
pub const NETWORK_KEYWORDS: [&str; 5] = ["connection", "timeout", "network", "socket", "reset"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Retryable,
    Fatal,
}

impl Verdict {
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::Retryable)
    }
}

/// Classify a failure against the default retryable status codes.
#[must_use]
pub fn classify(error: &AifError) -> Verdict {
    classify_by(error, |status| DEFAULT_RETRYABLE_STATUS_CODES.contains(&status))
}

/// Classify a failure against the status codes configured on `policy`.
#[must_use]
pub fn classify_with_policy(error: &AifError, policy: &RetryPolicy) -> Verdict {
    classify_by(error, |status| policy.retryable_status_codes.contains(&status))
}

fn classify_by(error: &AifError, retryable_status: impl Fn(u16) -> bool) -> Verdict {
    match error {
        AifError::Validation { .. } | AifError::Authentication { .. } | AifError::Cancelled => {
            Verdict::Fatal
        }
        AifError::RateLimit { .. } | AifError::Timeout { .. } => Verdict::Retryable,
        AifError::Database { code, .. } => {
            if db_codes::NON_RETRYABLE.contains(&code.as_str()) {
                Verdict::Fatal
            } else {
                Verdict::Retryable
            }
        }
        AifError::ExternalService { status_code, .. } => match status_code {
            Some(status) if retryable_status(*status) => Verdict::Retryable,
            _ => Verdict::Fatal,
        },
        AifError::Network { message } | AifError::Unknown { message } => {
            if is_network_message(message) {
                Verdict::Retryable
            } else {
                Verdict::Fatal
            }
        }
    }
}

#[must_use]
pub fn is_retryable_status_code(status_code: u16) -> bool {
    DEFAULT_RETRYABLE_STATUS_CODES.contains(&status_code)
}

#[must_use]
pub fn is_network_message(message: &str) -> bool {
    let normalized = message.to_lowercase();
    NETWORK_KEYWORDS.iter().any(|keyword| normalized.contains(keyword))
}

/// Errors the retry executor knows how to judge.
pub trait Classify {
    fn verdict(&self, policy: &RetryPolicy) -> Verdict;

    fn failure_kind(&self) -> FailureKind;

    /// Minimum wait suggested by the failing service, if any.
    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

impl Classify for AifError {
    fn verdict(&self, policy: &RetryPolicy) -> Verdict {
        classify_with_policy(self, policy)
    }

    fn failure_kind(&self) -> FailureKind {
        self.kind()
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            AifError::RateLimit { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}
