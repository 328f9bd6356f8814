//! Scripted store for tests.

use crate::records::{AgentVersion, HealthStatus, NewSkill, Skill, TestResultRecord};
use crate::store::TestStore;
use aif_core::{AifError, Result};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};

/// Wraps a [`TestStore`] and fails selected operations on demand.
///
/// Failures queued with [`fail_next`](Self::fail_next) are consumed one per
/// call of that operation; once the queue is empty calls reach the inner
/// store. Every call is counted by operation name.
pub struct FlakyStore<S> {
    inner: S,
    failures: Mutex<HashMap<&'static str, VecDeque<AifError>>>,
    calls: Mutex<HashMap<&'static str, usize>>,
}

impl<S: TestStore> FlakyStore<S> {
    pub fn new(inner: S) -> Self {
        Self { inner, failures: Mutex::default(), calls: Mutex::default() }
    }

    /// Queue `error` for the next call of `operation`.
    #[must_use]
    pub fn fail_next(self, operation: &'static str, error: AifError) -> Self {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(operation)
            .or_default()
            .push_back(error);
        self
    }

    /// Queue `error` for the next `times` calls of `operation`.
    #[must_use]
    pub fn fail_times(self, operation: &'static str, times: usize, error: AifError) -> Self {
        (0..times).fold(self, |store, _| store.fail_next(operation, error.clone()))
    }

    pub fn calls(&self, operation: &str) -> usize {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).get(operation).copied().unwrap_or(0)
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn enter(&self, operation: &'static str) -> Result<()> {
        *self.calls.lock().unwrap_or_else(PoisonError::into_inner).entry(operation).or_default() +=
            1;
        match self
            .failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(operation)
            .and_then(VecDeque::pop_front)
        {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl<S: TestStore> TestStore for FlakyStore<S> {
    async fn get_agent_version(&self, agent_id: &str) -> Result<Option<AgentVersion>> {
        self.enter("get_agent_version")?;
        self.inner.get_agent_version(agent_id).await
    }

    async fn get_agents_needing_testing(&self, limit: usize) -> Result<Vec<AgentVersion>> {
        self.enter("get_agents_needing_testing")?;
        self.inner.get_agents_needing_testing(limit).await
    }

    async fn save_test_result(&self, record: TestResultRecord) -> Result<String> {
        self.enter("save_test_result")?;
        self.inner.save_test_result(record).await
    }

    async fn update_agent_test_results(
        &self,
        agent_id: &str,
        score: f64,
        report_url: Option<&str>,
        test_result_id: &str,
    ) -> Result<()> {
        self.enter("update_agent_test_results")?;
        self.inner.update_agent_test_results(agent_id, score, report_url, test_result_id).await
    }

    async fn get_test_results_history(
        &self,
        agent_id: &str,
        limit: usize,
    ) -> Result<Vec<TestResultRecord>> {
        self.enter("get_test_results_history")?;
        self.inner.get_test_results_history(agent_id, limit).await
    }

    async fn get_skill(&self, agent_id: &str) -> Result<Option<Skill>> {
        self.enter("get_skill")?;
        self.inner.get_skill(agent_id).await
    }

    async fn save_skill(&self, skill: NewSkill) -> Result<String> {
        self.enter("save_skill")?;
        self.inner.save_skill(skill).await
    }

    async fn health_check(&self) -> HealthStatus {
        match self.enter("health_check") {
            Ok(()) => self.inner.health_check().await,
            Err(error) => HealthStatus::unhealthy(0, error.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryTestStore;

    #[tokio::test]
    async fn test_queued_failures_then_passthrough() {
        let store = FlakyStore::new(
            InMemoryTestStore::new().with_agent(AgentVersion::new("a1")),
        )
        .fail_times("get_agent_version", 2, AifError::network("connection reset"));

        assert!(store.get_agent_version("a1").await.is_err());
        assert!(store.get_agent_version("a1").await.is_err());
        assert!(store.get_agent_version("a1").await.unwrap().is_some());
        assert_eq!(store.calls("get_agent_version"), 3);
        assert_eq!(store.calls("get_skill"), 0);
    }

    #[tokio::test]
    async fn test_failing_health_check_reports_unhealthy() {
        let store = FlakyStore::new(InMemoryTestStore::new())
            .fail_next("health_check", AifError::network("socket closed"));
        let health = store.health_check().await;
        assert!(!health.healthy);
        assert!(health.error.unwrap_or_default().contains("socket closed"));
        assert!(store.health_check().await.healthy);
    }
}
