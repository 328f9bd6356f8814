use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The agent under test, as far as the judge needs to know it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentProfile {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub system_prompt: Option<String>,
    /// Free-form agent configuration; some deployments store it as a JSON string.
    #[serde(default)]
    pub agent_config: Option<Value>,
}

impl AgentProfile {
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

    /// Name used in prompts and logs, falling back to the id.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().filter(|name| !name.is_empty()).unwrap_or(&self.id)
    }
}

/// One replayed test case: what the lead said and what the agent answered.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestCaseObservation {
    pub test_name: String,
    #[serde(default)]
    pub input: String,
    #[serde(default)]
    pub agent_response: String,
    #[serde(default)]
    pub expected_behavior: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rubric_focus: Vec<String>,
    /// Any extra fields recorded by the test runner are passed through to the judge.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TestCaseObservation {
    pub fn new(
        test_name: impl Into<String>,
        input: impl Into<String>,
        agent_response: impl Into<String>,
    ) -> Self {
        Self {
            test_name: test_name.into(),
            input: input.into(),
            agent_response: agent_response.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_expected_behavior(mut self, expected: impl Into<String>) -> Self {
        self.expected_behavior = Some(expected.into());
        self
    }
}
