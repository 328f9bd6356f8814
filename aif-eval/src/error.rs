//! Error types for the evaluation layer
//!
//! These never leave [`Evaluator::evaluate`](crate::Evaluator::evaluate):
//! they are turned into a fallback result there.

use aif_core::AifError;
use thiserror::Error;

/// Result type alias for evaluation operations
pub type Result<T> = std::result::Result<T, EvalError>;

#[derive(Error, Debug)]
pub enum EvalError {
    /// The judge call failed after retries, or was cancelled
    #[error("{0}")]
    Judge(#[from] AifError),

    /// Test observations could not be rendered into the prompt
    #[error("Failed to render test observations: {0}")]
    Render(#[from] serde_json::Error),

    #[error("Empty response from judge")]
    EmptyResponse,
}
