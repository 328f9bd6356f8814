//! Turning free-text judge output into a validated [`EvaluationResult`].
//!
//! The judge is asked for a bare JSON object but routinely wraps it in a
//! markdown fence, adds prose around it, omits fields or reports scores that
//! are not numbers. Extraction tries the fenced payload first and then the first
//! balanced `{...}` in the text. Whatever is found is completed with defaults
//! and checked against the weighted-score invariant. Anything unusable
//! becomes [`EvaluationResult::fallback`]; this module never fails.

use aif_telemetry::{debug, warn};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::result::{DimensionScores, EvaluationMetadata, EvaluationResult, TestCaseEvaluation};
use crate::rubric::{Dimension, MAX_SCORE, MIN_SCORE, NEUTRAL_SCORE, round2};

/// Largest accepted gap between the reported and the weighted overall score.
pub const DEFAULT_SCORE_TOLERANCE: f64 = 0.5;

const FENCE: &str = "```";

#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum ExtractionError {
    #[error("Failed to parse evaluation response")]
    NoJson,
    #[error("Evaluation response is not a JSON object")]
    NotAnObject,
}

/// Parse and validate with the default score tolerance.
pub fn parse_and_validate(raw: &str) -> EvaluationResult {
    ResponseValidator::default().validate(raw)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResponseValidator {
    tolerance: f64,
}

impl Default for ResponseValidator {
    fn default() -> Self {
        Self { tolerance: DEFAULT_SCORE_TOLERANCE }
    }
}

impl ResponseValidator {
    /// Negative or non-finite tolerances fall back to the default.
    pub fn new(tolerance: f64) -> Self {
        if tolerance.is_finite() && tolerance >= 0.0 {
            Self { tolerance }
        } else {
            Self::default()
        }
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    pub fn validate(&self, raw: &str) -> EvaluationResult {
        match extract_document(raw) {
            Ok(document) => self.validate_document(&document),
            Err(err) => {
                warn!(response_length = raw.len(), reason = %err, "could not extract evaluation JSON");
                EvaluationResult::fallback(err.to_string())
            }
        }
    }

    /// Complete an already-parsed judge document with defaults and enforce the score invariant.
    pub fn validate_document(&self, document: &Map<String, Value>) -> EvaluationResult {
        let dimension_scores = dimension_scores(document.get("scores"));
        let reported = document.get("overall_score").and_then(score_value).unwrap_or(NEUTRAL_SCORE);
        let weighted = dimension_scores.weighted();

        let overall_score = if (weighted - reported).abs() > self.tolerance {
            debug!(reported, weighted, "overall score inconsistent with dimensions; recomputed");
            round2(weighted)
        } else {
            reported
        };

        EvaluationResult {
            overall_score,
            dimension_scores,
            per_test_evaluations: test_case_evaluations(document.get("test_case_evaluations")),
            strengths: string_list(document.get("strengths")),
            weaknesses: string_list(document.get("weaknesses")),
            failures: string_list(document.get("failures")),
            warnings: string_list(document.get("warnings")),
            recommendations: string_list(document.get("recommendations")),
            metadata: EvaluationMetadata::default(),
        }
    }
}

pub(crate) fn extract_document(raw: &str) -> Result<Map<String, Value>, ExtractionError> {
    let value = match serde_json::from_str::<Value>(strip_fences(raw)) {
        Ok(value) => value,
        Err(_) => first_embedded_object(raw).ok_or(ExtractionError::NoJson)?,
    };

    match value {
        Value::Object(map) => Ok(map),
        _ => Err(ExtractionError::NotAnObject),
    }
}

/// Trim and drop a leading fence (with optional language tag) and a trailing fence.
fn strip_fences(raw: &str) -> &str {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix(FENCE) {
        let tag_len = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '_'))
            .unwrap_or(rest.len());
        text = &rest[tag_len..];
    }
    if let Some(rest) = text.strip_suffix(FENCE) {
        text = rest;
    }
    text.trim()
}

/// First balanced `{...}` substring of `text` that parses as JSON.
///
/// Gives up at the first `{` that never closes: the scan already reached
/// the end of the text.
fn first_embedded_object(text: &str) -> Option<Value> {
    let mut search_from = 0;
    while let Some(offset) = text[search_from..].find('{') {
        let start = search_from + offset;
        let end = balanced_object_end(&text[start..])?;
        if let Ok(value) = serde_json::from_str::<Value>(&text[start..start + end]) {
            return Some(value);
        }
        search_from = start + 1;
    }
    None
}

/// Byte length of the brace-balanced prefix of `text`, which starts with `{`.
fn balanced_object_end(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (idx, ch) in text.char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(idx + ch.len_utf8());
                }
            }
            _ => {}
        }
    }
    None
}

/// Numeric score clamped into range; anything else counts as absent.
fn score_value(value: &Value) -> Option<f64> {
    let score = value.as_f64()?;
    score.is_finite().then(|| score.clamp(MIN_SCORE, MAX_SCORE))
}

fn dimension_scores(value: Option<&Value>) -> DimensionScores {
    let mut scores = DimensionScores::default();
    if let Some(Value::Object(map)) = value {
        for dim in Dimension::ALL {
            if let Some(score) = map.get(dim.as_str()).and_then(score_value) {
                scores.set(dim, score);
            }
        }
    }
    scores
}

fn test_case_evaluations(value: Option<&Value>) -> Vec<TestCaseEvaluation> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(Value::as_object)
        .map(|item| TestCaseEvaluation {
            test_name: item.get("test_name").map(text_value).unwrap_or_default(),
            score: item.get("score").and_then(score_value).unwrap_or(MIN_SCORE),
            passed: item.get("passed").and_then(Value::as_bool).unwrap_or(false),
            feedback: item.get("feedback").map(text_value).unwrap_or_default(),
        })
        .collect()
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => {
            items.iter().filter(|item| !item.is_null()).map(text_value).collect()
        }
        Some(Value::String(single)) if !single.trim().is_empty() => vec![single.clone()],
        _ => Vec::new(),
    }
}

fn text_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
