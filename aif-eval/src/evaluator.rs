//! LLM-as-judge evaluation
//!
//! Composes prompt construction, a retried judge call and response validation
//! into one result per agent test run.

use aif_core::{AgentProfile, AifError, JudgeClient, JudgeRequest, JudgeResponse, TestCaseObservation};
use aif_retry::{CancellationToken, RetryExecutor, RetryObserver, RetryPolicy};
use aif_telemetry::{Instrument, Span, error, evaluation_span, info, judge_call_span, record_fallback};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::{EvalError, Result};
use crate::prompt::render_prompt;
use crate::response::{DEFAULT_SCORE_TOLERANCE, ResponseValidator};
use crate::result::EvaluationResult;
use crate::rubric::DEFAULT_RUBRIC;

/// Configuration for the [`Evaluator`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluatorConfig {
    /// Model label recorded in result metadata; defaults to the judge's own model name
    pub model: Option<String>,
    /// Temperature for the judge (low for consistency)
    pub temperature: f32,
    /// Maximum tokens for the judge response
    pub max_tokens: u32,
    /// Largest accepted gap between the reported and the weighted overall score
    pub score_tolerance: f64,
    /// Rubric used when the caller supplies none; the built-in rubric otherwise
    pub rubric: Option<String>,
    /// Retry policy for judge calls
    pub judge_policy: RetryPolicy,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            model: None,
            temperature: 0.3,
            max_tokens: 4000,
            score_tolerance: DEFAULT_SCORE_TOLERANCE,
            rubric: None,
            judge_policy: RetryPolicy::judge(),
        }
    }
}

impl EvaluatorConfig {
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    #[must_use]
    pub fn with_judge_policy(mut self, judge_policy: RetryPolicy) -> Self {
        self.judge_policy = judge_policy;
        self
    }

    #[must_use]
    pub fn with_score_tolerance(mut self, score_tolerance: f64) -> Self {
        self.score_tolerance = score_tolerance;
        self
    }

    #[must_use]
    pub fn with_rubric(mut self, rubric: impl Into<String>) -> Self {
        self.rubric = Some(rubric.into());
        self
    }

    pub fn validate(&self) -> aif_core::Result<()> {
        if !(0.0..=1.0).contains(&self.temperature) {
            return Err(AifError::invalid_field(
                "temperature",
                format!("temperature must be within [0, 1], got {}", self.temperature),
            ));
        }
        if self.max_tokens == 0 {
            return Err(AifError::invalid_field("max_tokens", "max_tokens must be at least 1"));
        }
        if !self.score_tolerance.is_finite() || self.score_tolerance < 0.0 {
            return Err(AifError::invalid_field(
                "score_tolerance",
                format!("score_tolerance must be a non-negative number, got {}", self.score_tolerance),
            ));
        }
        self.judge_policy.validate()
    }
}

/// Evaluates agent test runs with an LLM judge.
///
/// `evaluate` always returns a result: judge failures, exhausted retries,
/// cancellation and unparseable responses all produce
/// [`EvaluationResult::fallback`].
pub struct Evaluator {
    judge: Arc<dyn JudgeClient>,
    config: EvaluatorConfig,
    validator: ResponseValidator,
    executor: RetryExecutor,
}

impl Evaluator {
    pub fn new(judge: Arc<dyn JudgeClient>) -> Self {
        Self::with_config(judge, EvaluatorConfig::default())
    }

    pub fn with_config(judge: Arc<dyn JudgeClient>, config: EvaluatorConfig) -> Self {
        let validator = ResponseValidator::new(config.score_tolerance);
        let executor = RetryExecutor::new(config.judge_policy.clone()).named("judge.call");
        Self { judge, config, validator, executor }
    }

    /// Abort pending judge retries when `token` is cancelled.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.executor = self.executor.with_cancellation(token);
        self
    }

    #[must_use]
    pub fn with_retry_observer(mut self, observer: Arc<dyn RetryObserver>) -> Self {
        self.executor = self.executor.with_shared_observer(observer);
        self
    }

    pub fn config(&self) -> &EvaluatorConfig {
        &self.config
    }

    /// Model label recorded in result metadata.
    pub fn model_name(&self) -> &str {
        self.config.model.as_deref().unwrap_or_else(|| self.judge.model_name())
    }

    /// Evaluate one agent run.
    ///
    /// `rubric` overrides the configured rubric, typically with the agent's skill rubric.
    pub async fn evaluate(
        &self,
        agent: &AgentProfile,
        rubric: Option<&str>,
        test_results: &[TestCaseObservation],
    ) -> EvaluationResult {
        let span = evaluation_span(&agent.id, test_results.len());
        let started = Instant::now();

        async {
            info!(agent.id = %agent.id, test.count = test_results.len(), "starting agent evaluation");

            let mut result = match self.try_evaluate(agent, rubric, test_results).await {
                Ok(result) => result,
                Err(err) => {
                    error!(agent.id = %agent.id, error = %err, "evaluation failed; using fallback");
                    let mut fallback = EvaluationResult::fallback(err.to_string());
                    fallback.metadata.model = Some(self.model_name().to_string());
                    fallback
                }
            };
            result.metadata.total_duration_ms = millis(started.elapsed());
            record_fallback(&Span::current(), result.is_fallback());

            info!(
                agent.id = %agent.id,
                overall_score = result.overall_score,
                is_fallback = result.is_fallback(),
                input_tokens = result.metadata.input_tokens,
                output_tokens = result.metadata.output_tokens,
                duration_ms = result.metadata.total_duration_ms,
                "agent evaluation completed"
            );
            result
        }
        .instrument(span)
        .await
    }

    async fn try_evaluate(
        &self,
        agent: &AgentProfile,
        rubric: Option<&str>,
        test_results: &[TestCaseObservation],
    ) -> Result<EvaluationResult> {
        let rubric = rubric
            .filter(|r| !r.trim().is_empty())
            .or(self.config.rubric.as_deref())
            .unwrap_or(DEFAULT_RUBRIC);
        let prompt = render_prompt(agent, rubric, test_results)?;
        let request = JudgeRequest::new(prompt)
            .with_temperature(self.config.temperature)
            .with_max_tokens(self.config.max_tokens);

        let api_started = Instant::now();
        let response = self.call_judge(request).await?;
        let api_duration = api_started.elapsed();

        if response.text.trim().is_empty() {
            return Err(EvalError::EmptyResponse);
        }

        let mut result = self.validator.validate(&response.text);
        result.metadata.model = Some(self.model_name().to_string());
        result.metadata.input_tokens = response.input_tokens;
        result.metadata.output_tokens = response.output_tokens;
        result.metadata.api_duration_ms = millis(api_duration);
        Ok(result)
    }

    async fn call_judge(&self, request: JudgeRequest) -> std::result::Result<JudgeResponse, AifError> {
        let model = self.judge.model_name().to_string();
        self.executor
            .run(|| {
                let judge = Arc::clone(&self.judge);
                let request = request.clone();
                let span = judge_call_span(&model);
                async move {
                    let response = judge.call(request).await?;
                    info!(
                        input_tokens = response.input_tokens,
                        output_tokens = response.output_tokens,
                        total_tokens = response.total_tokens(),
                        "judge call completed"
                    );
                    Ok::<_, AifError>(response)
                }
                .instrument(span)
            })
            .await
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
