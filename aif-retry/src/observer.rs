//! Retry notifications.
//!
//! Observers are called inline from the retry loop, right before the backoff
//! wait, and must not block.

use aif_core::FailureKind;
use std::time::Duration;
use tokio::sync::mpsc;

/// Longest failure message carried by a [`RetryEvent`].
pub const MAX_EVENT_MESSAGE_CHARS: usize = 200;

/// Emitted once per retry, before the executor waits.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryEvent {
    pub operation: String,
    /// The attempt that just failed (1-indexed).
    pub attempt: u32,
    pub max_attempts: u32,
    pub wait: Duration,
    pub kind: FailureKind,
    pub message: String,
}

impl RetryEvent {
    pub(crate) fn new(
        operation: &str,
        attempt: u32,
        max_attempts: u32,
        wait: Duration,
        kind: FailureKind,
        message: &str,
    ) -> Self {
        Self {
            operation: operation.to_string(),
            attempt,
            max_attempts,
            wait,
            kind,
            message: truncate_chars(message, MAX_EVENT_MESSAGE_CHARS),
        }
    }
}

fn truncate_chars(message: &str, max_chars: usize) -> String {
    match message.char_indices().nth(max_chars) {
        Some((idx, _)) => message[..idx].to_string(),
        None => message.to_string(),
    }
}

pub trait RetryObserver: Send + Sync {
    fn on_retry(&self, event: &RetryEvent);
}

impl<F> RetryObserver for F
where
    F: Fn(&RetryEvent) + Send + Sync,
{
    fn on_retry(&self, event: &RetryEvent) {
        self(event)
    }
}

/// Forwards events to an unbounded channel. A dropped receiver is ignored.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    sender: mpsc::UnboundedSender<RetryEvent>,
}

impl ChannelObserver {
    pub fn new(sender: mpsc::UnboundedSender<RetryEvent>) -> Self {
        Self { sender }
    }

    /// Create an observer together with the receiving end.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<RetryEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self::new(sender), receiver)
    }
}

impl RetryObserver for ChannelObserver {
    fn on_retry(&self, event: &RetryEvent) {
        let _ = self.sender.send(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn event(message: &str) -> RetryEvent {
        RetryEvent::new(
            "get_agent_version",
            1,
            5,
            Duration::from_millis(500),
            FailureKind::Database,
            message,
        )
    }

    #[test]
    fn test_message_is_truncated() {
        let long = "é".repeat(500);
        let truncated = event(&long);
        assert_eq!(truncated.message.chars().count(), MAX_EVENT_MESSAGE_CHARS);
        assert_eq!(event("short").message, "short");
    }

    #[test]
    fn test_closure_observer() {
        let seen = Mutex::new(Vec::new());
        let observer = |event: &RetryEvent| seen.lock().unwrap().push(event.attempt);
        observer.on_retry(&event("boom"));
        observer.on_retry(&event("boom"));
        assert_eq!(*seen.lock().unwrap(), vec![1, 1]);
    }

    #[test]
    fn test_channel_observer_delivers_and_ignores_closed_receiver() {
        let (observer, mut receiver) = ChannelObserver::channel();
        observer.on_retry(&event("pool exhausted"));
        let received = receiver.try_recv().unwrap();
        assert_eq!(received.operation, "get_agent_version");
        assert_eq!(received.kind, FailureKind::Database);

        drop(receiver);
        observer.on_retry(&event("pool exhausted"));
    }
}
