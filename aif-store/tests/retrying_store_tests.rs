//! Retry behaviour of the store decorator against injected failures.

use std::sync::Arc;
use std::time::Duration;

use aif_core::{AifError, db_codes};
use aif_retry::{CancellationToken, ChannelObserver, RetryPolicy};
use aif_store::testing::FlakyStore;
use aif_store::{
    AgentStatus, AgentVersion, InMemoryTestStore, RetryingStore, TestResultRecord, TestStore,
};

fn seeded() -> InMemoryTestStore {
    InMemoryTestStore::new()
        .with_agent(AgentVersion::new("a1").with_name("Ana"))
        .with_agent(AgentVersion::new("a2").with_name("Ben"))
}

#[tokio::test(start_paused = true)]
async fn transient_failures_are_retried_until_success() {
    let flaky = FlakyStore::new(seeded())
        .fail_next("get_agent_version", AifError::database(db_codes::CONNECTION, "pool exhausted"))
        .fail_next("get_agent_version", AifError::network("connection reset by peer"));
    let (observer, mut events) = ChannelObserver::channel();
    let store = RetryingStore::new(flaky).with_observer(Arc::new(observer));

    let agent = store.get_agent_version("a1").await.unwrap();

    assert_eq!(agent.map(|a| a.id), Some("a1".to_string()));
    assert_eq!(store.inner().calls("get_agent_version"), 3);
    let first = events.try_recv().unwrap();
    assert_eq!(first.operation, "get_agent_version");
    assert_eq!(first.max_attempts, 5);
    assert_eq!(events.try_recv().unwrap().attempt, 2);
}

#[tokio::test(start_paused = true)]
async fn constraint_errors_are_not_retried() {
    let store = RetryingStore::new(FlakyStore::new(seeded()));
    let record = TestResultRecord::new("a1", 8.5, "judge").with_id("r1");

    store.save_test_result(record.clone()).await.unwrap();
    let err = store.save_test_result(record).await.unwrap_err();

    assert!(matches!(&err, AifError::Database { code, .. } if code == db_codes::UNIQUE_VIOLATION));
    assert_eq!(store.inner().calls("save_test_result"), 2);

    let err = store.update_agent_test_results("ghost", 9.0, None, "r1").await.unwrap_err();
    assert!(matches!(&err, AifError::Database { code, .. } if code == db_codes::NOT_FOUND));
    assert_eq!(store.inner().calls("update_agent_test_results"), 1);
}

#[tokio::test(start_paused = true)]
async fn persistent_outage_exhausts_attempts() {
    let policy = RetryPolicy::database().with_max_attempts(3).with_jitter(false);
    let flaky = FlakyStore::new(seeded()).fail_times(
        "get_agents_needing_testing",
        10,
        AifError::database(db_codes::CONNECTION, "could not connect to server"),
    );
    let store = RetryingStore::with_policy(flaky, policy);

    let started = tokio::time::Instant::now();
    let err = store.get_agents_needing_testing(10).await.unwrap_err();

    assert!(matches!(&err, AifError::Database { code, .. } if code == db_codes::CONNECTION));
    assert_eq!(store.inner().calls("get_agents_needing_testing"), 3);
    // 0.5s + 1s of backoff, no wait after the last attempt
    assert!(started.elapsed() >= Duration::from_millis(1500));
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test(start_paused = true)]
async fn writes_are_replayed_with_the_same_payload() {
    let flaky = FlakyStore::new(seeded())
        .fail_next("save_test_result", AifError::timeout("statement timeout"));
    let store = RetryingStore::new(flaky);

    let id = store
        .save_test_result(TestResultRecord::new("a1", 9.0, "judge").with_id("r-fixed"))
        .await
        .unwrap();
    store.update_agent_test_results("a1", 9.0, Some("https://reports/r-fixed"), &id).await.unwrap();

    assert_eq!(id, "r-fixed");
    assert_eq!(store.inner().calls("save_test_result"), 2);
    let history = store.get_test_results_history("a1", 5).await.unwrap();
    assert_eq!(history.len(), 1);
    let agent = store.get_agent_version("a1").await.unwrap().unwrap();
    assert_eq!(agent.status, AgentStatus::Active);
    assert!(agent.framework_approved);
}

#[tokio::test(start_paused = true)]
async fn cancellation_stops_retrying() {
    let token = CancellationToken::new();
    token.cancel();
    let flaky = FlakyStore::new(seeded());
    let store = RetryingStore::new(flaky).with_cancellation(token);

    let err = store.get_skill("a1").await.unwrap_err();

    assert!(matches!(err, AifError::Cancelled));
    assert_eq!(store.inner().calls("get_skill"), 0);
}

#[tokio::test(start_paused = true)]
async fn health_check_is_not_retried() {
    let flaky = FlakyStore::new(seeded()).fail_next("health_check", AifError::network("socket hang up"));
    let store = RetryingStore::new(flaky);

    assert!(!store.health_check().await.healthy);
    assert_eq!(store.inner().calls("health_check"), 1);
}

#[tokio::test(start_paused = true)]
async fn shared_store_behind_arc() {
    let shared: Arc<dyn TestStore> = Arc::new(seeded());
    let store = RetryingStore::new(shared);
    assert_eq!(store.get_agents_needing_testing(10).await.unwrap().len(), 2);
}
