//! Scoring dimensions, their weights and the default rubric text.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Score assumed for a dimension the judge did not report.
pub const NEUTRAL_SCORE: f64 = 5.0;

pub const MIN_SCORE: f64 = 0.0;
pub const MAX_SCORE: f64 = 10.0;

/// The five fixed evaluation dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Completeness,
    Tone,
    Engagement,
    Compliance,
    Conversion,
}

impl Dimension {
    pub const ALL: [Dimension; 5] = [
        Dimension::Completeness,
        Dimension::Tone,
        Dimension::Engagement,
        Dimension::Compliance,
        Dimension::Conversion,
    ];

    /// Share of the overall score. Weights sum to 1.0.
    pub fn weight(self) -> f64 {
        match self {
            Dimension::Completeness => 0.25,
            Dimension::Tone | Dimension::Engagement | Dimension::Compliance => 0.20,
            Dimension::Conversion => 0.15,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Dimension::Completeness => "completeness",
            Dimension::Tone => "tone",
            Dimension::Engagement => "engagement",
            Dimension::Compliance => "compliance",
            Dimension::Conversion => "conversion",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Weighted overall score for dimension scores keyed by name, rounded to 2 decimals.
///
/// Missing dimensions count as [`NEUTRAL_SCORE`]; unknown keys are ignored.
pub fn calculate_weighted_score(scores: &HashMap<String, f64>) -> f64 {
    let total: f64 = Dimension::ALL
        .iter()
        .map(|dim| scores.get(dim.as_str()).copied().unwrap_or(NEUTRAL_SCORE) * dim.weight())
        .sum();
    round2(total)
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Rubric used when neither the caller nor the agent's skill provides one.
pub const DEFAULT_RUBRIC: &str = r#"
## SDR Agent Evaluation Rubric

### 1. COMPLETENESS (25%)
Did the agent collect complete BANT information?
- Budget: did it uncover the lead's investment capacity?
- Authority: did it identify the decision maker?
- Need: did it understand the real pain or need?
- Timeline: did it ask about deadlines or urgency?

**Score:**
- 10: Full BANT, all 4 dimensions covered
- 8: 3 of 4 dimensions covered
- 6: 2 of 4 dimensions covered
- 4: Only 1 dimension covered
- 2: No qualification at all

### 2. TONE (20%)
Was the tone appropriate and professional?
- Consultative, not an aggressive seller
- Language suited to the context
- Empathy and active listening
- Personalized communication

**Score:**
- 10: Perfect tone, consultative and empathetic
- 8: Good tone, minor adjustments needed
- 6: Acceptable but generic tone
- 4: Inappropriate or overly aggressive tone
- 2: Completely wrong tone

### 3. ENGAGEMENT (20%)
Was the lead engaged in the conversation?
- Asked relevant questions
- Got answers from the lead
- Kept the conversation flowing
- Showed genuine interest

**Score:**
- 10: Excellent engagement, fluid conversation
- 8: Good engagement, participative lead
- 6: Average engagement
- 4: Disengaged lead
- 2: Conversation died, no engagement

### 4. COMPLIANCE (20%)
Did the agent follow its instructions and guardrails?
- Made no promises it cannot keep
- Followed the agent's script and prompt
- Leaked no sensitive information
- Stayed in scope

**Score:**
- 10: 100% compliance
- 8: Minor non-critical deviations
- 6: Some deviations from instructions
- 4: Significant deviations
- 2: Ignored instructions entirely

### 5. CONVERSION (15%)
Did the agent reach its conversion goal?
- Booked a meeting or call?
- Qualified the lead as MQL/SQL?
- Agreed on a defined next step?
- Moved the lead down the funnel?

**Score:**
- 10: Full conversion, meeting booked
- 8: Clear next step defined
- 6: Lead qualified but not converted
- 4: Inconclusive conversation
- 2: Lead lost or disqualified
"#;
