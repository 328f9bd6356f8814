use crate::records::{AgentVersion, HealthStatus, NewSkill, Skill, TestResultRecord};
use crate::store::TestStore;
use aif_core::Result;
use aif_retry::{CancellationToken, RetryExecutor, RetryObserver, RetryPolicy};
use aif_telemetry::{Instrument, store_span};
use async_trait::async_trait;
use std::sync::Arc;

/// Decorates a [`TestStore`] so every call runs under a retry policy.
///
/// Each operation is retried under its own name (`get_agent_version`,
/// `save_test_result`, ...) so logs and retry events say what was being done.
/// `health_check` is not retried: it reports, it does not fail.
pub struct RetryingStore<S> {
    inner: S,
    executor: RetryExecutor,
}

impl<S: TestStore> RetryingStore<S> {
    /// Wrap `inner` with [`RetryPolicy::database`].
    pub fn new(inner: S) -> Self {
        Self::with_policy(inner, RetryPolicy::database())
    }

    pub fn with_policy(inner: S, policy: RetryPolicy) -> Self {
        Self { inner, executor: RetryExecutor::new(policy) }
    }

    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn RetryObserver>) -> Self {
        self.executor = self.executor.with_shared_observer(observer);
        self
    }

    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.executor = self.executor.with_cancellation(token);
        self
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn policy(&self) -> &RetryPolicy {
        self.executor.policy()
    }

    fn executor(&self, operation: &str) -> RetryExecutor {
        self.executor.clone().named(operation)
    }
}

#[async_trait]
impl<S: TestStore> TestStore for RetryingStore<S> {
    async fn get_agent_version(&self, agent_id: &str) -> Result<Option<AgentVersion>> {
        self.executor("get_agent_version")
            .run(|| self.inner.get_agent_version(agent_id))
            .instrument(store_span("get_agent_version"))
            .await
    }

    async fn get_agents_needing_testing(&self, limit: usize) -> Result<Vec<AgentVersion>> {
        self.executor("get_agents_needing_testing")
            .run(|| self.inner.get_agents_needing_testing(limit))
            .instrument(store_span("get_agents_needing_testing"))
            .await
    }

    async fn save_test_result(&self, record: TestResultRecord) -> Result<String> {
        self.executor("save_test_result")
            .run(|| self.inner.save_test_result(record.clone()))
            .instrument(store_span("save_test_result"))
            .await
    }

    async fn update_agent_test_results(
        &self,
        agent_id: &str,
        score: f64,
        report_url: Option<&str>,
        test_result_id: &str,
    ) -> Result<()> {
        self.executor("update_agent_test_results")
            .run(|| {
                self.inner.update_agent_test_results(agent_id, score, report_url, test_result_id)
            })
            .instrument(store_span("update_agent_test_results"))
            .await
    }

    async fn get_test_results_history(
        &self,
        agent_id: &str,
        limit: usize,
    ) -> Result<Vec<TestResultRecord>> {
        self.executor("get_test_results_history")
            .run(|| self.inner.get_test_results_history(agent_id, limit))
            .instrument(store_span("get_test_results_history"))
            .await
    }

    async fn get_skill(&self, agent_id: &str) -> Result<Option<Skill>> {
        self.executor("get_skill")
            .run(|| self.inner.get_skill(agent_id))
            .instrument(store_span("get_skill"))
            .await
    }

    async fn save_skill(&self, skill: NewSkill) -> Result<String> {
        self.executor("save_skill")
            .run(|| self.inner.save_skill(skill.clone()))
            .instrument(store_span("save_skill"))
            .await
    }

    async fn health_check(&self) -> HealthStatus {
        self.inner.health_check().instrument(store_span("health_check")).await
    }
}

#[async_trait]
impl<T: TestStore + ?Sized> TestStore for Arc<T> {
    async fn get_agent_version(&self, agent_id: &str) -> Result<Option<AgentVersion>> {
        (**self).get_agent_version(agent_id).await
    }

    async fn get_agents_needing_testing(&self, limit: usize) -> Result<Vec<AgentVersion>> {
        (**self).get_agents_needing_testing(limit).await
    }

    async fn save_test_result(&self, record: TestResultRecord) -> Result<String> {
        (**self).save_test_result(record).await
    }

    async fn update_agent_test_results(
        &self,
        agent_id: &str,
        score: f64,
        report_url: Option<&str>,
        test_result_id: &str,
    ) -> Result<()> {
        (**self).update_agent_test_results(agent_id, score, report_url, test_result_id).await
    }

    async fn get_test_results_history(
        &self,
        agent_id: &str,
        limit: usize,
    ) -> Result<Vec<TestResultRecord>> {
        (**self).get_test_results_history(agent_id, limit).await
    }

    async fn get_skill(&self, agent_id: &str) -> Result<Option<Skill>> {
        (**self).get_skill(agent_id).await
    }

    async fn save_skill(&self, skill: NewSkill) -> Result<String> {
        (**self).save_skill(skill).await
    }

    async fn health_check(&self) -> HealthStatus {
        (**self).health_check().await
    }
}
