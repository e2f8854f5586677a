//! End to end through a real pool and loopback workers.
mod support;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::Verdict;
use db::InMemoryRunStore;
use invoker_pool::worker::{serve, ExecutionBackend};
use invoker_pool::{
    AssumeAlive, InvokerPool, PoolConfig, PoolOptions, TestingRequest, TestingResponse,
};
use judge::{NullSink, Orchestrator, Submission};
use support::{add_task, elementwise_sum, event_with, RecordedAlerts, ADD_SOURCE};
use testsys::NotebookContainer;
use tokio::net::TcpListener;

struct Backend {
    delay: Duration,
}

#[async_trait]
impl ExecutionBackend for Backend {
    async fn execute(&self, request: TestingRequest) -> TestingResponse {
        tokio::time::sleep(self.delay).await;
        TestingResponse::ok(elementwise_sum(&request.args))
    }
}

async fn pool_with(delay: Duration, timeout: Duration, alerts: Arc<RecordedAlerts>) -> InvokerPool {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(serve(listener, Arc::new(Backend { delay })));

    let config = PoolConfig::new("127.0.0.1", [(port, "loopback")]);
    InvokerPool::with_options(&config, Arc::new(AssumeAlive), PoolOptions { timeout, alerts })
        .unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_submission_judged_through_the_pool() {
    let pool = pool_with(Duration::ZERO, Duration::from_secs(5), Arc::default()).await;
    let store = Arc::new(InMemoryRunStore::new());
    let judge = Orchestrator::new(Arc::new(pool.clone()), store.clone());

    let event = event_with(vec![add_task()]);
    let submission = Submission::new("week-1", "pia", NotebookContainer::single(ADD_SOURCE));
    let results = judge.judge(&event, &submission, &NullSink).await;

    assert_eq!(results["add"].verdict, Verdict::Correct, "{}", results["add"]);
    assert_eq!(results["add"].worker.as_ref().unwrap().id, "loopback");
    assert_eq!(pool.snapshot().free, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_unresponsive_sandbox_is_check_failed() {
    let alerts = Arc::new(RecordedAlerts::default());
    let pool = pool_with(Duration::from_secs(3), Duration::from_millis(300), alerts.clone()).await;
    let judge = Orchestrator::new(Arc::new(pool), Arc::new(InMemoryRunStore::new()))
        .with_alerts(alerts.clone());

    let event = event_with(vec![add_task()]);
    let submission = Submission::new("week-1", "quinn", NotebookContainer::single(ADD_SOURCE));
    let results = judge.judge(&event, &submission, &NullSink).await;

    assert_eq!(results["add"].verdict, Verdict::CheckFailed);
    assert_eq!(
        results["add"].cause.as_deref(),
        Some("[test 1] invoker failed to respond in 0.3s")
    );
    // one from the pool, one from the orchestrator
    assert_eq!(alerts.messages().len(), 2);
}
