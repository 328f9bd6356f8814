//! Judge prompt construction.

use aif_core::{AgentProfile, TestCaseObservation};
use serde_json::Value;

use crate::error::Result;

/// Purpose used when nothing in the profile describes the agent.
pub const DEFAULT_PURPOSE: &str = "Sales development agent qualifying inbound leads";

/// Stand-in for a missing system prompt.
pub const SYSTEM_PROMPT_UNAVAILABLE: &str = "(system prompt unavailable)";

/// Character budget for the system prompt summary.
pub const SUMMARY_BUDGET_CHARS: usize = 1000;

const PURPOSE_MAX_CHARS: usize = 200;
const SUMMARY_MARKER: &str = "\n...(summarized)";
const PURPOSE_CONFIG_KEYS: [&str; 2] = ["purpose", "objective"];
const INSTRUCTION_KEYWORDS: [&str; 8] = [
    "you are",
    "objective",
    "never",
    "always",
    "important",
    "rule",
    "guardrail",
    "forbidden",
];

/// Render the full judge prompt for one agent run.
pub fn render_prompt(
    agent: &AgentProfile,
    rubric: &str,
    test_results: &[TestCaseObservation],
) -> Result<String> {
    let test_cases_json = serde_json::to_string_pretty(test_results)?;
    let system_prompt_summary =
        summarize_system_prompt(agent.system_prompt.as_deref().unwrap_or(""), SUMMARY_BUDGET_CHARS);

    Ok(format!(
        r#"You are an expert evaluator of sales development (SDR/BDR) agents.

## AGENT INFORMATION
Name: {name}
Purpose: {purpose}
System instructions (summary):
{system_prompt_summary}

## EVALUATION RUBRIC
{rubric}

## EXECUTED TEST CASES
{test_cases_json}

## TASK
Analyze each test case and score the agent on the 5 dimensions.
For each case, consider:
- The lead's input
- The agent's response
- The expected behavior

## REQUIRED RESPONSE
Return valid JSON with exactly this structure:

```json
{{
  "overall_score": 8.5,
  "scores": {{
    "completeness": 9.0,
    "tone": 8.5,
    "engagement": 8.0,
    "compliance": 9.0,
    "conversion": 7.5
  }},
  "test_case_evaluations": [
    {{
      "test_name": "test name",
      "score": 8.5,
      "passed": true,
      "feedback": "Specific feedback about this case"
    }}
  ],
  "strengths": ["Strength 1", "Strength 2"],
  "weaknesses": ["Area to improve 1", "Area to improve 2"],
  "failures": ["Critical failure 1 (if any)"],
  "warnings": ["Identified risk (if any)"],
  "recommendations": ["Improvement recommendation 1", "Improvement recommendation 2"]
}}
```

IMPORTANT:
- Be objective and fair
- Base the scores only on evidence from the tests
- overall_score is the weighted average: (completeness*0.25 + tone*0.20 + engagement*0.20 + compliance*0.20 + conversion*0.15)
- All scores range from 0 to 10
- If a test did not cover a dimension, rely on what was observable
- Return ONLY the JSON, with no text before or after
"#,
        name = agent.display_name(),
        purpose = extract_purpose(agent),
    ))
}

/// One-line statement of what the agent is for.
///
/// Looks at the description, then `purpose`/`objective` in the agent config
/// (an object or a JSON string), then the first non-blank line of the system
/// prompt.
pub fn extract_purpose(agent: &AgentProfile) -> String {
    if let Some(description) = agent.description.as_deref().filter(|d| !d.trim().is_empty()) {
        return description.to_string();
    }

    if let Some(purpose) = agent.agent_config.as_ref().and_then(config_purpose) {
        return purpose;
    }

    agent
        .system_prompt
        .as_deref()
        .and_then(|prompt| prompt.lines().map(str::trim).find(|line| !line.is_empty()))
        .map(|line| line.chars().take(PURPOSE_MAX_CHARS).collect())
        .unwrap_or_else(|| DEFAULT_PURPOSE.to_string())
}

fn config_purpose(config: &Value) -> Option<String> {
    let parsed;
    let config = match config {
        Value::String(raw) => {
            parsed = serde_json::from_str::<Value>(raw).ok()?;
            &parsed
        }
        other => other,
    };

    PURPOSE_CONFIG_KEYS.iter().find_map(|key| {
        config.get(*key).and_then(Value::as_str).filter(|s| !s.trim().is_empty()).map(String::from)
    })
}

/// Shorten a system prompt to at most `budget` characters plus a marker.
///
/// Short prompts are returned verbatim. Longer ones keep lines carrying an
/// instruction keyword, plus any line seen while the summary is still under
/// half the budget.
pub fn summarize_system_prompt(system_prompt: &str, budget: usize) -> String {
    if system_prompt.trim().is_empty() {
        return SYSTEM_PROMPT_UNAVAILABLE.to_string();
    }
    if system_prompt.chars().count() <= budget {
        return system_prompt.to_string();
    }

    let mut kept: Vec<&str> = Vec::new();
    let mut used = 0usize;

    for line in system_prompt.lines().map(str::trim).filter(|line| !line.is_empty()) {
        let len = line.chars().count();
        let lowered = line.to_lowercase();
        let important = INSTRUCTION_KEYWORDS.iter().any(|kw| lowered.contains(kw));

        if (important || used * 2 < budget) && used + len <= budget {
            kept.push(line);
            used += len;
        }
    }

    let mut summary = kept.join("\n");
    summary.push_str(SUMMARY_MARKER);
    summary
}
