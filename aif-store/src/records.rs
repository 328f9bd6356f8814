use aif_core::AgentProfile;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

/// Score at or above which an agent version is approved for production.
pub const APPROVAL_THRESHOLD: f64 = 8.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    #[default]
    Pending,
    Active,
    NeedsImprovement,
}

impl AgentStatus {
    /// Status an agent moves to after scoring `score`.
    pub fn from_score(score: f64) -> Self {
        if is_approved(score) { Self::Active } else { Self::NeedsImprovement }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::NeedsImprovement => "needs_improvement",
        }
    }
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn is_approved(score: f64) -> bool {
    score >= APPROVAL_THRESHOLD
}

/// A deployed version of an agent, with its latest test outcome.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentVersion {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub agent_config: Option<Value>,
    #[serde(default)]
    pub status: AgentStatus,
    #[serde(default)]
    pub last_test_score: Option<f64>,
    #[serde(default)]
    pub last_test_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub test_report_url: Option<String>,
    #[serde(default)]
    pub framework_approved: bool,
}

impl AgentVersion {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into(), ..Default::default() }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    #[must_use]
    pub fn with_agent_config(mut self, agent_config: Value) -> Self {
        self.agent_config = Some(agent_config);
        self
    }

    #[must_use]
    pub fn with_status(mut self, status: AgentStatus) -> Self {
        self.status = status;
        self
    }

    /// Never tested, or still waiting for a first verdict.
    pub fn needs_testing(&self) -> bool {
        self.last_test_at.is_none() || self.status == AgentStatus::Pending
    }

    /// What the judge gets to see about this agent.
    pub fn profile(&self) -> AgentProfile {
        AgentProfile {
            id: self.id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            system_prompt: self.system_prompt.clone(),
            agent_config: self.agent_config.clone(),
        }
    }
}

/// Versioned testing instructions for an agent, including an optional rubric override.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Skill {
    pub id: String,
    pub agent_version_id: String,
    pub version: u32,
    pub instructions: String,
    #[serde(default)]
    pub examples: Option<String>,
    #[serde(default)]
    pub rubric: Option<String>,
    #[serde(default)]
    pub test_cases: Vec<Value>,
    #[serde(default)]
    pub local_file_path: Option<String>,
    pub last_synced_at: DateTime<Utc>,
}

/// Content of a skill to store; the store assigns id and version.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewSkill {
    pub agent_version_id: String,
    pub instructions: String,
    #[serde(default)]
    pub examples: Option<String>,
    #[serde(default)]
    pub rubric: Option<String>,
    #[serde(default)]
    pub test_cases: Vec<Value>,
    #[serde(default)]
    pub local_file_path: Option<String>,
}

impl NewSkill {
    pub fn new(agent_version_id: impl Into<String>, instructions: impl Into<String>) -> Self {
        Self {
            agent_version_id: agent_version_id.into(),
            instructions: instructions.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_examples(mut self, examples: impl Into<String>) -> Self {
        self.examples = Some(examples.into());
        self
    }

    #[must_use]
    pub fn with_rubric(mut self, rubric: impl Into<String>) -> Self {
        self.rubric = Some(rubric.into());
        self
    }

    #[must_use]
    pub fn with_test_cases(mut self, test_cases: Vec<Value>) -> Self {
        self.test_cases = test_cases;
        self
    }

    #[must_use]
    pub fn with_local_file_path(mut self, path: impl Into<String>) -> Self {
        self.local_file_path = Some(path.into());
        self
    }

    pub(crate) fn into_skill(self, version: u32) -> Skill {
        Skill {
            id: Uuid::new_v4().to_string(),
            agent_version_id: self.agent_version_id,
            version,
            instructions: self.instructions,
            examples: self.examples,
            rubric: self.rubric,
            test_cases: self.test_cases,
            local_file_path: self.local_file_path,
            last_synced_at: Utc::now(),
        }
    }
}

/// One stored evaluation of an agent version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResultRecord {
    pub id: String,
    pub agent_version_id: String,
    pub overall_score: f64,
    /// The full evaluation result as JSON.
    pub test_details: Value,
    #[serde(default)]
    pub report_url: Option<String>,
    pub test_duration_ms: u64,
    pub evaluator_model: String,
    pub created_at: DateTime<Utc>,
}

impl TestResultRecord {
    /// New record with a fresh id, stamped now.
    pub fn new(
        agent_version_id: impl Into<String>,
        overall_score: f64,
        evaluator_model: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            agent_version_id: agent_version_id.into(),
            overall_score,
            test_details: Value::Null,
            report_url: None,
            test_duration_ms: 0,
            evaluator_model: evaluator_model.into(),
            created_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    #[must_use]
    pub fn with_test_details(mut self, test_details: Value) -> Self {
        self.test_details = test_details;
        self
    }

    #[must_use]
    pub fn with_report_url(mut self, report_url: impl Into<String>) -> Self {
        self.report_url = Some(report_url.into());
        self
    }

    #[must_use]
    pub fn with_test_duration_ms(mut self, test_duration_ms: u64) -> Self {
        self.test_duration_ms = test_duration_ms;
        self
    }

    #[must_use]
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub healthy: bool,
    pub latency_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HealthStatus {
    pub fn healthy(latency_ms: u64) -> Self {
        Self { healthy: true, latency_ms, error: None }
    }

    pub fn unhealthy(latency_ms: u64, error: impl Into<String>) -> Self {
        Self { healthy: false, latency_ms, error: Some(error.into()) }
    }
}
