//! Evaluation results
//!
//! Field names on the wire follow the JSON contract the judge is asked to
//! answer with, so a stored result can be read back by the same tooling.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::rubric::{Dimension, NEUTRAL_SCORE, round2};

/// Warning attached to every fallback result.
pub const FALLBACK_WARNING: &str = "Fallback evaluation used due to error";

/// Recommendation attached to every fallback result.
pub const FALLBACK_RECOMMENDATION: &str = "Re-run evaluation after fixing the error";

/// Scores for the five rubric dimensions, each within `[0, 10]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DimensionScores {
    pub completeness: f64,
    pub tone: f64,
    pub engagement: f64,
    pub compliance: f64,
    pub conversion: f64,
}

impl Default for DimensionScores {
    fn default() -> Self {
        Self::uniform(NEUTRAL_SCORE)
    }
}

impl DimensionScores {
    pub fn uniform(score: f64) -> Self {
        Self {
            completeness: score,
            tone: score,
            engagement: score,
            compliance: score,
            conversion: score,
        }
    }

    pub fn get(&self, dimension: Dimension) -> f64 {
        match dimension {
            Dimension::Completeness => self.completeness,
            Dimension::Tone => self.tone,
            Dimension::Engagement => self.engagement,
            Dimension::Compliance => self.compliance,
            Dimension::Conversion => self.conversion,
        }
    }

    pub fn set(&mut self, dimension: Dimension, score: f64) {
        let slot = match dimension {
            Dimension::Completeness => &mut self.completeness,
            Dimension::Tone => &mut self.tone,
            Dimension::Engagement => &mut self.engagement,
            Dimension::Compliance => &mut self.compliance,
            Dimension::Conversion => &mut self.conversion,
        };
        *slot = score;
    }

    /// Weighted overall score, unrounded.
    pub fn weighted(&self) -> f64 {
        Dimension::ALL.iter().map(|dim| self.get(*dim) * dim.weight()).sum()
    }

    pub fn to_map(&self) -> HashMap<String, f64> {
        Dimension::ALL.iter().map(|dim| (dim.as_str().to_string(), self.get(*dim))).collect()
    }
}

/// The judge's verdict on one replayed test case.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TestCaseEvaluation {
    pub test_name: String,
    pub score: f64,
    pub passed: bool,
    pub feedback: String,
}

/// Bookkeeping about how a result was produced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub api_duration_ms: u64,
    pub total_duration_ms: u64,
    pub is_fallback: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Structured outcome of evaluating one agent test run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub overall_score: f64,
    #[serde(rename = "scores")]
    pub dimension_scores: DimensionScores,
    #[serde(rename = "test_case_evaluations", default)]
    pub per_test_evaluations: Vec<TestCaseEvaluation>,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub weaknesses: Vec<String>,
    #[serde(default)]
    pub failures: Vec<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(rename = "_metadata", default)]
    pub metadata: EvaluationMetadata,
}

impl Default for EvaluationResult {
    fn default() -> Self {
        let dimension_scores = DimensionScores::default();
        Self {
            overall_score: round2(dimension_scores.weighted()),
            dimension_scores,
            per_test_evaluations: Vec::new(),
            strengths: Vec::new(),
            weaknesses: Vec::new(),
            failures: Vec::new(),
            warnings: Vec::new(),
            recommendations: Vec::new(),
            metadata: EvaluationMetadata::default(),
        }
    }
}

impl EvaluationResult {
    /// Neutral result returned when no trustworthy evaluation could be produced.
    pub fn fallback(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self {
            overall_score: NEUTRAL_SCORE,
            failures: vec![format!("Evaluation failed: {reason}")],
            warnings: vec![FALLBACK_WARNING.to_string()],
            recommendations: vec![FALLBACK_RECOMMENDATION.to_string()],
            metadata: EvaluationMetadata {
                is_fallback: true,
                error: Some(reason),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.metadata.is_fallback
    }

    /// Whether the result clears `threshold` and is a real evaluation.
    pub fn meets(&self, threshold: f64) -> bool {
        !self.is_fallback() && self.overall_score >= threshold
    }

    pub fn passed_test_count(&self) -> usize {
        self.per_test_evaluations.iter().filter(|t| t.passed).count()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
