//tests/pool.rs
mod support;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use support::{request, spawn_worker, RecordedAlerts, SummingBackend, SwitchProbe};
use invoker_pool::{
    AssumeAlive, Invoker, InvokerPool, PoolConfig, PoolError, PoolOptions, SandboxProbe,
};
use serde_json::json;
use tokio::time::Instant;

async fn pool_of(
    backend: Arc<SummingBackend>,
    workers: usize,
    probe: Arc<dyn SandboxProbe>,
    alerts: Arc<RecordedAlerts>,
    timeout: Duration,
) -> InvokerPool {
    let mut slots = Vec::new();
    for i in 0..workers {
        let port = spawn_worker(backend.clone()).await;
        slots.push((port, format!("sandbox-{i}")));
    }
    let config = PoolConfig::new("127.0.0.1", slots);
    InvokerPool::with_options(&config, probe, PoolOptions { timeout, alerts }).unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_pool_respects_worker_count() {
    let backend = SummingBackend::new(Duration::from_millis(200));
    let pool = pool_of(
        backend.clone(),
        2,
        Arc::new(AssumeAlive),
        Arc::new(RecordedAlerts::default()),
        Duration::from_secs(5),
    )
    .await;

    let start = Instant::now();
    let handles: Vec<_> = (0..6)
        .map(|i| {
            let pool = pool.clone();
            tokio::spawn(async move { pool.invoke(&request(vec![json!(i), json!(1)])).await })
        })
        .collect();
    let results = futures::future::join_all(handles).await;
    let elapsed = start.elapsed();

    for (i, result) in results.into_iter().enumerate() {
        let execution = result.expect("task should not panic").expect("invoke succeeds");
        assert!(execution.response.verdict.is_correct());
        assert_eq!(execution.response.value(), json!(i as i64 + 1));
    }

    assert_eq!(backend.served.load(Ordering::SeqCst), 6);
    assert!(
        backend.max_running.load(Ordering::SeqCst) <= 2,
        "observed {} concurrent requests on 2 workers",
        backend.max_running.load(Ordering::SeqCst)
    );
    // three rounds of 200ms on two workers
    assert!(elapsed >= Duration::from_millis(550), "finished too fast: {elapsed:?}");

    let snapshot = pool.snapshot();
    assert_eq!(snapshot.total, 2);
    assert_eq!(snapshot.free, 2);
    assert_eq!(snapshot.busy, 0);
}

#[tokio::test]
async fn test_handle_holds_slot_until_released() {
    let backend = SummingBackend::new(Duration::ZERO);
    let pool = pool_of(
        backend,
        2,
        Arc::new(AssumeAlive),
        Arc::new(RecordedAlerts::default()),
        Duration::from_secs(5),
    )
    .await;

    let mut handle = pool.acquire().await.unwrap();
    let snapshot = pool.snapshot();
    assert_eq!((snapshot.free, snapshot.busy), (1, 1));
    assert_eq!(snapshot.free + snapshot.busy, snapshot.total);

    let response = handle.exchange(&request(vec![json!(2), json!(3)])).await.unwrap();
    assert_eq!(response.value(), json!(5));
    assert!(matches!(
        handle.exchange(&request(vec![])).await,
        Err(PoolError::HandleReused)
    ));
    handle.release().await.unwrap();
    assert_eq!(pool.snapshot().free, 2);
}

#[tokio::test]
async fn test_dropped_handle_is_released_in_background() {
    let backend = SummingBackend::new(Duration::ZERO);
    let pool = pool_of(
        backend,
        1,
        Arc::new(AssumeAlive),
        Arc::new(RecordedAlerts::default()),
        Duration::from_secs(5),
    )
    .await;

    drop(pool.acquire().await.unwrap());
    let handle = tokio::time::timeout(Duration::from_secs(2), pool.acquire())
        .await
        .expect("slot comes back after drop")
        .unwrap();
    handle.release().await.unwrap();
}

#[tokio::test]
async fn test_unresponsive_worker_yields_check_failed() {
    let backend = SummingBackend::new(Duration::from_secs(3));
    let alerts = Arc::new(RecordedAlerts::default());
    let pool = pool_of(
        backend,
        1,
        Arc::new(AssumeAlive),
        alerts.clone(),
        Duration::from_millis(250),
    )
    .await;

    let execution = pool.invoke(&request(vec![json!(1)])).await.unwrap();
    assert_eq!(execution.response.verdict, common::Verdict::CheckFailed);
    assert_eq!(
        execution.response.message.as_deref(),
        Some("invoker failed to respond in 0.25s")
    );
    assert_eq!(execution.worker.id, "sandbox-0");
    assert_eq!(alerts.messages().len(), 1);
    assert!(alerts.messages()[0].contains("not responding"));
    assert_eq!(pool.snapshot().free, 1);
}

#[tokio::test]
async fn test_dead_sandbox_is_quarantined_and_revived() {
    let backend = SummingBackend::new(Duration::ZERO);
    let probe = Arc::new(SwitchProbe::default());
    let alerts = Arc::new(RecordedAlerts::default());
    let pool = pool_of(backend, 2, probe.clone(), alerts.clone(), Duration::from_secs(5)).await;

    probe.set_dead(true);
    let err = pool.invoke(&request(vec![json!(1)])).await.unwrap_err();
    let port = match err {
        PoolError::FailedSandbox { id, port, logs } => {
            assert!(id.starts_with("sandbox-"));
            assert!(logs.contains("segmentation fault"));
            port
        }
        other => panic!("unexpected error {other}"),
    };
    assert!(alerts.messages()[0].contains("segmentation fault"));

    let snapshot = pool.snapshot();
    assert_eq!(snapshot.quarantined, 1);
    assert_eq!(snapshot.busy, 1);
    assert_eq!(snapshot.free + snapshot.busy, snapshot.total);

    // the second sandbox also dies: nothing left to hand out
    assert!(pool.invoke(&request(vec![])).await.is_err());
    assert!(matches!(
        pool.invoke(&request(vec![])).await,
        Err(PoolError::NoLiveSlots)
    ));

    assert!(!pool.revive(port).await.unwrap());
    probe.set_dead(false);
    assert!(pool.revive(port).await.unwrap());

    let execution = pool.invoke(&request(vec![json!(4)])).await.unwrap();
    assert_eq!(execution.worker.port, port);
    assert_eq!(pool.snapshot().quarantined, 1);
}

#[tokio::test]
async fn test_waiters_fail_when_last_slot_dies() {
    let backend = SummingBackend::new(Duration::ZERO);
    let probe = Arc::new(SwitchProbe::default());
    let pool = pool_of(
        backend,
        1,
        probe.clone(),
        Arc::new(RecordedAlerts::default()),
        Duration::from_secs(5),
    )
    .await;

    let handle = pool.acquire().await.unwrap();
    let waiter = {
        let pool = pool.clone();
        tokio::spawn(async move { pool.acquire().await.map(|_| ()) })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    probe.set_dead(true);
    assert!(handle.release().await.is_err());
    let waited = waiter.await.unwrap();
    assert!(matches!(waited, Err(PoolError::NoLiveSlots)));
}

#[test]
fn test_unknown_ports_are_rejected() {
    let config = PoolConfig::new("127.0.0.1", Vec::<(u16, String)>::new());
    assert!(matches!(
        InvokerPool::new(&config, Arc::new(AssumeAlive)),
        Err(PoolError::Config(_))
    ));

    let config = PoolConfig::new("127.0.0.1", [(65044u16, "a")]);
    let pool = InvokerPool::new(&config, Arc::new(AssumeAlive)).unwrap();
    assert_eq!(pool.workers()[0].to_string(), "a:65044");
}
