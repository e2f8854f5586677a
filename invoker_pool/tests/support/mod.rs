#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use invoker_pool::worker::{serve, ExecutionBackend};
use invoker_pool::{AlertSink, SandboxProbe, TestingRequest, TestingResponse};
use serde_json::Value;
use tokio::net::TcpListener;

/// Starts a loopback worker and returns its port.
pub async fn spawn_worker(backend: Arc<dyn ExecutionBackend>) -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(serve(listener, backend));
    port
}

/// Answers with the sum of the numeric arguments after `delay`, tracking how
/// many requests run at once across every worker sharing it.
pub struct SummingBackend {
    pub delay: Duration,
    pub running: AtomicUsize,
    pub max_running: AtomicUsize,
    pub served: AtomicUsize,
}

impl SummingBackend {
    pub fn new(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            running: AtomicUsize::new(0),
            max_running: AtomicUsize::new(0),
            served: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl ExecutionBackend for SummingBackend {
    async fn execute(&self, request: TestingRequest) -> TestingResponse {
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_running.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.running.fetch_sub(1, Ordering::SeqCst);
        self.served.fetch_add(1, Ordering::SeqCst);

        let sum: i64 = request.args.iter().filter_map(Value::as_i64).sum();
        TestingResponse::ok(Value::from(sum))
    }
}

/// Liveness controlled by the test.
#[derive(Default)]
pub struct SwitchProbe {
    pub dead: AtomicBool,
}

impl SwitchProbe {
    pub fn set_dead(&self, dead: bool) {
        self.dead.store(dead, Ordering::SeqCst);
    }
}

#[async_trait]
impl SandboxProbe for SwitchProbe {
    async fn is_running(&self, _id: &str) -> bool {
        !self.dead.load(Ordering::SeqCst)
    }

    async fn logs(&self, id: &str) -> String {
        format!("{id}: segmentation fault")
    }
}

#[derive(Default)]
pub struct RecordedAlerts(pub Mutex<Vec<String>>);

impl RecordedAlerts {
    pub fn messages(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

impl AlertSink for RecordedAlerts {
    fn alert(&self, message: &str) {
        self.0.lock().unwrap().push(message.to_string());
    }
}

pub fn request(args: Vec<Value>) -> TestingRequest {
    TestingRequest {
        executor: None,
        source: "def f(*args):\n    return sum(args)\n".into(),
        args,
        kwargs: Default::default(),
        time_limit: 1.0,
    }
}
