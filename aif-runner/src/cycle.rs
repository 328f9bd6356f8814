use aif_core::{AifError, JudgeClient, Result, TestCaseObservation, db_codes};
use aif_eval::{EvaluationResult, Evaluator};
use aif_retry::CancellationToken;
use aif_store::{HealthStatus, RetryingStore, TestResultRecord, TestStore, is_approved};
use aif_telemetry::{info, warn};
use futures::stream::{self, StreamExt};
use std::sync::Arc;

use crate::config::{AifConfig, DEFAULT_MAX_CONCURRENCY};

/// One agent to test, with the observations replayed against it.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentJob {
    pub agent_id: String,
    pub observations: Vec<TestCaseObservation>,
}

impl AgentJob {
    pub fn new(agent_id: impl Into<String>, observations: Vec<TestCaseObservation>) -> Self {
        Self { agent_id: agent_id.into(), observations }
    }
}

/// What a completed cycle stored.
#[derive(Debug, Clone)]
pub struct CycleOutcome {
    pub record: TestResultRecord,
    pub evaluation: EvaluationResult,
    pub approved: bool,
}

/// Per-agent outcome of a batch.
#[derive(Debug)]
pub struct BatchItem {
    pub agent_id: String,
    pub outcome: Result<CycleOutcome>,
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub items: Vec<BatchItem>,
}

impl BatchReport {
    pub fn succeeded(&self) -> impl Iterator<Item = &CycleOutcome> {
        self.items.iter().filter_map(|item| item.outcome.as_ref().ok())
    }

    pub fn failed(&self) -> impl Iterator<Item = (&str, &AifError)> {
        self.items
            .iter()
            .filter_map(|item| item.outcome.as_ref().err().map(|err| (item.agent_id.as_str(), err)))
    }

    pub fn approved_count(&self) -> usize {
        self.succeeded().filter(|outcome| outcome.approved).count()
    }

    pub fn fallback_count(&self) -> usize {
        self.succeeded().filter(|outcome| outcome.evaluation.is_fallback()).count()
    }

    pub fn item(&self, agent_id: &str) -> Option<&BatchItem> {
        self.items.iter().find(|item| item.agent_id == agent_id)
    }
}

/// Load, evaluate, persist, approve: one test cycle per agent.
///
/// Store failures are returned to the caller. Judge failures are not: the
/// evaluator turns them into a fallback result, which is stored like any
/// other.
pub struct TestCycle {
    store: Arc<dyn TestStore>,
    evaluator: Arc<Evaluator>,
    max_concurrency: usize,
    report_base_url: Option<String>,
}

impl TestCycle {
    pub fn new(store: Arc<dyn TestStore>, evaluator: Arc<Evaluator>) -> Self {
        Self { store, evaluator, max_concurrency: DEFAULT_MAX_CONCURRENCY, report_base_url: None }
    }

    /// Wire a cycle from configuration: the store is wrapped in a
    /// [`RetryingStore`] with the configured database policy.
    pub fn from_config<S>(store: S, judge: Arc<dyn JudgeClient>, config: &AifConfig) -> Self
    where
        S: TestStore + 'static,
    {
        Self::from_config_with_cancellation(store, judge, config, CancellationToken::new())
    }

    /// Like [`from_config`](Self::from_config), with pending retries of both
    /// store and judge stopped by `token`.
    pub fn from_config_with_cancellation<S>(
        store: S,
        judge: Arc<dyn JudgeClient>,
        config: &AifConfig,
        token: CancellationToken,
    ) -> Self
    where
        S: TestStore + 'static,
    {
        let store = RetryingStore::with_policy(store, config.database_retry.clone())
            .with_cancellation(token.clone());
        let evaluator =
            Evaluator::with_config(judge, config.evaluator.clone()).with_cancellation(token);

        Self {
            store: Arc::new(store),
            evaluator: Arc::new(evaluator),
            max_concurrency: config.max_concurrency,
            report_base_url: config.report_base_url.clone(),
        }
    }

    #[must_use]
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    #[must_use]
    pub fn with_report_base_url(mut self, base: impl Into<String>) -> Self {
        self.report_base_url = Some(base.into());
        self
    }

    pub fn store(&self) -> &Arc<dyn TestStore> {
        &self.store
    }

    pub async fn health(&self) -> HealthStatus {
        self.store.health_check().await
    }

    /// Run one cycle for `agent_id`.
    ///
    /// A missing agent is a `Database` error with code
    /// [`db_codes::NOT_FOUND`]. A failing skill lookup only costs the custom
    /// rubric.
    pub async fn run(
        &self,
        agent_id: &str,
        observations: &[TestCaseObservation],
    ) -> Result<CycleOutcome> {
        let agent = self.store.get_agent_version(agent_id).await?.ok_or_else(|| {
            AifError::database(db_codes::NOT_FOUND, format!("Agent version not found: {agent_id}"))
        })?;

        let rubric = match self.store.get_skill(agent_id).await {
            Ok(skill) => skill.and_then(|skill| skill.rubric),
            Err(err) => {
                warn!(agent.id = %agent_id, error = %err, "skill lookup failed; using default rubric");
                None
            }
        };

        let evaluation =
            self.evaluator.evaluate(&agent.profile(), rubric.as_deref(), observations).await;

        let test_details = serde_json::to_value(&evaluation)
            .map_err(|err| AifError::unknown(format!("cannot serialize evaluation: {err}")))?;
        let mut record =
            TestResultRecord::new(agent_id, evaluation.overall_score, self.evaluator.model_name())
                .with_test_details(test_details)
                .with_test_duration_ms(evaluation.metadata.total_duration_ms);
        if let Some(url) = self.report_url(agent_id, &record.id) {
            record = record.with_report_url(url);
        }

        let record_id = self.store.save_test_result(record.clone()).await?;
        self.store
            .update_agent_test_results(
                agent_id,
                record.overall_score,
                record.report_url.as_deref(),
                &record_id,
            )
            .await?;

        let approved = is_approved(record.overall_score);
        info!(
            agent.id = %agent_id,
            test_result.id = %record_id,
            score = record.overall_score,
            approved,
            is_fallback = evaluation.is_fallback(),
            "agent test results stored"
        );
        Ok(CycleOutcome { record, evaluation, approved })
    }

    /// Run a cycle per job, at most `max_concurrency` at a time.
    ///
    /// Items complete in any order; a failing agent is reported in its item
    /// and the rest of the batch carries on.
    pub async fn run_batch(&self, jobs: Vec<AgentJob>) -> BatchReport {
        let total = jobs.len();
        let items: Vec<BatchItem> = stream::iter(jobs)
            .map(|job| async move {
                let outcome = self.run(&job.agent_id, &job.observations).await;
                if let Err(err) = &outcome {
                    warn!(agent.id = %job.agent_id, error = %err, "agent test cycle failed");
                }
                BatchItem { agent_id: job.agent_id, outcome }
            })
            .buffer_unordered(self.max_concurrency.max(1))
            .collect()
            .await;

        let report = BatchReport { items };
        info!(
            agents = total,
            failed = report.failed().count(),
            approved = report.approved_count(),
            fallbacks = report.fallback_count(),
            "test batch completed"
        );
        report
    }

    fn report_url(&self, agent_id: &str, result_id: &str) -> Option<String> {
        self.report_base_url
            .as_deref()
            .map(|base| format!("{}/{agent_id}/{result_id}", base.trim_end_matches('/')))
    }
}
