use crate::records::{AgentVersion, HealthStatus, NewSkill, Skill, TestResultRecord};
use aif_core::Result;
use async_trait::async_trait;

/// Persistence capability of the testing backend.
///
/// Failures are reported as [`AifError::Database`](aif_core::AifError::Database)
/// with one of the [`db_codes`](aif_core::db_codes), which the retry
/// classifier understands.
#[async_trait]
pub trait TestStore: Send + Sync {
    async fn get_agent_version(&self, agent_id: &str) -> Result<Option<AgentVersion>>;

    /// Agents never tested, or still pending, up to `limit`.
    async fn get_agents_needing_testing(&self, limit: usize) -> Result<Vec<AgentVersion>>;

    /// Store a test result and return its id.
    async fn save_test_result(&self, record: TestResultRecord) -> Result<String>;

    /// Record the latest score on the agent and approve or flag it.
    async fn update_agent_test_results(
        &self,
        agent_id: &str,
        score: f64,
        report_url: Option<&str>,
        test_result_id: &str,
    ) -> Result<()>;

    /// Newest first, up to `limit`.
    async fn get_test_results_history(
        &self,
        agent_id: &str,
        limit: usize,
    ) -> Result<Vec<TestResultRecord>>;

    /// Latest version of the agent's skill.
    async fn get_skill(&self, agent_id: &str) -> Result<Option<Skill>>;

    /// Store a new skill version (latest + 1) and return its id.
    async fn save_skill(&self, skill: NewSkill) -> Result<String>;

    async fn health_check(&self) -> HealthStatus;
}
