use crate::records::{AgentStatus, AgentVersion, HealthStatus, NewSkill, Skill, TestResultRecord};
use crate::store::TestStore;
use aif_core::{AifError, Result, db_codes};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Default)]
struct Tables {
    agents: BTreeMap<String, AgentVersion>,
    // insertion order, oldest first
    results: Vec<TestResultRecord>,
    skills: BTreeMap<String, Vec<Skill>>,
}

/// Process-local [`TestStore`], for tests and single-node development.
///
/// Cloning shares the underlying tables.
#[derive(Clone, Default)]
pub struct InMemoryTestStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryTestStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an agent version.
    pub fn upsert_agent(&self, agent: AgentVersion) {
        self.write().agents.insert(agent.id.clone(), agent);
    }

    #[must_use]
    pub fn with_agent(self, agent: AgentVersion) -> Self {
        self.upsert_agent(agent);
        self
    }

    pub fn agent_count(&self) -> usize {
        self.read().agents.len()
    }

    pub fn result_count(&self) -> usize {
        self.read().results.len()
    }

    fn read(&self) -> RwLockReadGuard<'_, Tables> {
        self.tables.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Tables> {
        self.tables.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn agent_not_found(agent_id: &str) -> AifError {
    AifError::database(db_codes::NOT_FOUND, format!("Agent version not found: {agent_id}"))
}

fn check_score(score: f64) -> Result<()> {
    if score.is_finite() && (0.0..=10.0).contains(&score) {
        Ok(())
    } else {
        Err(AifError::database(
            db_codes::INVALID_INPUT,
            format!("score must be within [0, 10], got {score}"),
        ))
    }
}

#[async_trait]
impl TestStore for InMemoryTestStore {
    async fn get_agent_version(&self, agent_id: &str) -> Result<Option<AgentVersion>> {
        Ok(self.read().agents.get(agent_id).cloned())
    }

    async fn get_agents_needing_testing(&self, limit: usize) -> Result<Vec<AgentVersion>> {
        Ok(self
            .read()
            .agents
            .values()
            .filter(|agent| agent.needs_testing())
            .take(limit)
            .cloned()
            .collect())
    }

    async fn save_test_result(&self, record: TestResultRecord) -> Result<String> {
        check_score(record.overall_score)?;
        let mut tables = self.write();
        if !tables.agents.contains_key(&record.agent_version_id) {
            return Err(AifError::database(
                db_codes::FOREIGN_KEY_VIOLATION,
                format!("unknown agent version: {}", record.agent_version_id),
            ));
        }
        if tables.results.iter().any(|existing| existing.id == record.id) {
            return Err(AifError::database(
                db_codes::UNIQUE_VIOLATION,
                format!("duplicate test result id: {}", record.id),
            ));
        }
        let id = record.id.clone();
        tables.results.push(record);
        Ok(id)
    }

    async fn update_agent_test_results(
        &self,
        agent_id: &str,
        score: f64,
        report_url: Option<&str>,
        _test_result_id: &str,
    ) -> Result<()> {
        check_score(score)?;
        let mut tables = self.write();
        let agent = tables.agents.get_mut(agent_id).ok_or_else(|| agent_not_found(agent_id))?;

        let status = AgentStatus::from_score(score);
        agent.last_test_score = Some(score);
        agent.last_test_at = Some(Utc::now());
        agent.test_report_url = report_url.map(str::to_string);
        agent.framework_approved = status == AgentStatus::Active;
        agent.status = status;
        Ok(())
    }

    async fn get_test_results_history(
        &self,
        agent_id: &str,
        limit: usize,
    ) -> Result<Vec<TestResultRecord>> {
        let tables = self.read();
        let mut history: Vec<TestResultRecord> = tables
            .results
            .iter()
            .rev()
            .filter(|record| record.agent_version_id == agent_id)
            .cloned()
            .collect();
        // stable: equal timestamps keep newest-inserted first
        history.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        history.truncate(limit);
        Ok(history)
    }

    async fn get_skill(&self, agent_id: &str) -> Result<Option<Skill>> {
        Ok(self
            .read()
            .skills
            .get(agent_id)
            .and_then(|versions| versions.iter().max_by_key(|skill| skill.version))
            .cloned())
    }

    async fn save_skill(&self, skill: NewSkill) -> Result<String> {
        let mut tables = self.write();
        if !tables.agents.contains_key(&skill.agent_version_id) {
            return Err(AifError::database(
                db_codes::FOREIGN_KEY_VIOLATION,
                format!("unknown agent version: {}", skill.agent_version_id),
            ));
        }
        let versions = tables.skills.entry(skill.agent_version_id.clone()).or_default();
        let next = versions.iter().map(|existing| existing.version).max().unwrap_or(0) + 1;
        let stored = skill.into_skill(next);
        let id = stored.id.clone();
        versions.push(stored);
        Ok(id)
    }

    async fn health_check(&self) -> HealthStatus {
        HealthStatus::healthy(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aif_core::FailureKind;
    use chrono::Duration;
    use serde_json::json;

    fn store() -> InMemoryTestStore {
        InMemoryTestStore::new()
            .with_agent(AgentVersion::new("a1").with_name("Ana"))
            .with_agent(AgentVersion::new("a2").with_name("Ben"))
    }

    fn db_code(err: &AifError) -> &str {
        match err {
            AifError::Database { code, .. } => code,
            other => panic!("expected database error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_get_agent_version() {
        let store = store();
        let agent = store.get_agent_version("a1").await.unwrap().unwrap();
        assert_eq!(agent.name.as_deref(), Some("Ana"));
        assert!(store.get_agent_version("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_marks_approval() {
        let store = store();
        store.update_agent_test_results("a1", 8.0, Some("https://r/1"), "r1").await.unwrap();
        store.update_agent_test_results("a2", 7.9, None, "r2").await.unwrap();

        let a1 = store.get_agent_version("a1").await.unwrap().unwrap();
        assert_eq!(a1.status, AgentStatus::Active);
        assert!(a1.framework_approved);
        assert_eq!(a1.last_test_score, Some(8.0));
        assert_eq!(a1.test_report_url.as_deref(), Some("https://r/1"));
        assert!(a1.last_test_at.is_some());

        let a2 = store.get_agent_version("a2").await.unwrap().unwrap();
        assert_eq!(a2.status, AgentStatus::NeedsImprovement);
        assert!(!a2.framework_approved);
    }

    #[tokio::test]
    async fn test_update_missing_agent_is_not_found() {
        let err = store().update_agent_test_results("ghost", 9.0, None, "r").await.unwrap_err();
        assert_eq!(db_code(&err), db_codes::NOT_FOUND);
        assert_eq!(err.kind(), FailureKind::Database);
    }

    #[tokio::test]
    async fn test_update_rejects_out_of_range_score() {
        let err = store().update_agent_test_results("a1", 10.5, None, "r").await.unwrap_err();
        assert_eq!(db_code(&err), db_codes::INVALID_INPUT);
    }

    #[tokio::test]
    async fn test_agents_needing_testing() {
        let store = store();
        store.update_agent_test_results("a1", 9.0, None, "r1").await.unwrap();

        let pending = store.get_agents_needing_testing(10).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, "a2");
        assert!(store.get_agents_needing_testing(0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_result_constraints() {
        let store = store();
        let record = TestResultRecord::new("a1", 7.5, "judge").with_id("r1");
        assert_eq!(store.save_test_result(record.clone()).await.unwrap(), "r1");

        let err = store.save_test_result(record).await.unwrap_err();
        assert_eq!(db_code(&err), db_codes::UNIQUE_VIOLATION);

        let orphan = TestResultRecord::new("ghost", 7.5, "judge");
        let err = store.save_test_result(orphan).await.unwrap_err();
        assert_eq!(db_code(&err), db_codes::FOREIGN_KEY_VIOLATION);
        assert_eq!(store.result_count(), 1);
    }

    #[tokio::test]
    async fn test_history_is_newest_first() {
        let store = store();
        let base = Utc::now();
        for (i, score) in [6.0, 7.0, 8.0].into_iter().enumerate() {
            let record = TestResultRecord::new("a1", score, "judge")
                .with_id(format!("r{i}"))
                .with_created_at(base + Duration::seconds(i as i64));
            store.save_test_result(record).await.unwrap();
        }
        store.save_test_result(TestResultRecord::new("a2", 5.0, "judge")).await.unwrap();

        let history = store.get_test_results_history("a1", 2).await.unwrap();
        let ids: Vec<_> = history.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["r2", "r1"]);
    }

    #[tokio::test]
    async fn test_skill_versions_increment() {
        let store = store();
        assert!(store.get_skill("a1").await.unwrap().is_none());

        store.save_skill(NewSkill::new("a1", "v1 instructions")).await.unwrap();
        let id = store
            .save_skill(
                NewSkill::new("a1", "v2 instructions")
                    .with_rubric("CUSTOM RUBRIC")
                    .with_test_cases(vec![json!({"name": "greeting"})]),
            )
            .await
            .unwrap();

        let skill = store.get_skill("a1").await.unwrap().unwrap();
        assert_eq!(skill.id, id);
        assert_eq!(skill.version, 2);
        assert_eq!(skill.rubric.as_deref(), Some("CUSTOM RUBRIC"));

        let err = store.save_skill(NewSkill::new("ghost", "x")).await.unwrap_err();
        assert_eq!(db_code(&err), db_codes::FOREIGN_KEY_VIOLATION);
    }

    #[tokio::test]
    async fn test_health_check() {
        assert!(store().health_check().await.healthy);
    }
}
