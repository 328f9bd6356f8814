//! # aif-eval
//!
//! LLM-as-judge evaluation of AI sales agents.
//!
//! ## Features
//!
//! - **Prompt construction**: agent context, rubric and replayed test cases in one judge prompt
//! - **Resilient judge calls**: every call goes through [`aif_retry::RetryExecutor`]
//! - **Response validation**: fenced or prose-wrapped JSON is extracted, completed and checked
//!   against the weighted-score invariant
//! - **Always available**: failures become a deterministic fallback result
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use aif_eval::{Evaluator, EvaluatorConfig};
//! use std::sync::Arc;
//!
//! let evaluator = Evaluator::with_config(Arc::new(my_judge), EvaluatorConfig::default());
//! let result = evaluator.evaluate(&agent, skill_rubric.as_deref(), &observations).await;
//! if result.is_fallback() {
//!     // schedule a re-run
//! }
//! ```

pub mod error;
pub mod evaluator;
pub mod prompt;
pub mod response;
pub mod result;
pub mod rubric;
pub mod testing;

pub use error::{EvalError, Result};
pub use evaluator::{Evaluator, EvaluatorConfig};
pub use prompt::{extract_purpose, render_prompt, summarize_system_prompt};
pub use response::{DEFAULT_SCORE_TOLERANCE, ResponseValidator, parse_and_validate};
pub use result::{DimensionScores, EvaluationMetadata, EvaluationResult, TestCaseEvaluation};
pub use rubric::{DEFAULT_RUBRIC, Dimension, NEUTRAL_SCORE, calculate_weighted_score};
