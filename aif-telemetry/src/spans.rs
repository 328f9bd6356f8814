//! Span helpers for common operations
//!
//! Provides pre-configured spans for instrumenting evaluations, judge calls,
//! retried operations and store access.

use tracing::Span;

/// Create a span for one agent evaluation
///
/// # Example
/// ```
/// use aif_telemetry::evaluation_span;
/// let span = evaluation_span("agent-42", 3);
/// let _enter = span.enter();
/// ```
pub fn evaluation_span(agent_id: &str, test_count: usize) -> Span {
    tracing::info_span!(
        "evaluation.run",
        agent.id = agent_id,
        test.count = test_count,
        evaluation.fallback = tracing::field::Empty,
    )
}

/// Create a span for a single judge call
pub fn judge_call_span(model_name: &str) -> Span {
    tracing::info_span!("judge.call", model.name = model_name, otel.kind = "client")
}

/// Create a span covering every attempt of a retried operation
pub fn retry_span(operation: &str, max_attempts: u32) -> Span {
    tracing::debug_span!("retry.execute", operation = operation, retry.max_attempts = max_attempts)
}

/// Create a span for a store operation
pub fn store_span(operation: &str) -> Span {
    tracing::debug_span!("store.call", operation = operation)
}

/// Mark the current evaluation span as having produced a fallback result
pub fn record_fallback(span: &Span, is_fallback: bool) {
    span.record("evaluation.fallback", is_fallback);
}
