#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use invoker_pool::{
    AlertSink, Execution, Invoker, PoolError, TestingRequest, TestingResponse, WorkerSignature,
};
use judge::progress::Results;
use judge::{Progress, ProgressSink};
use serde_json::{json, Value};
use testsys::check::{CloseNumbers, SequenceOf};
use testsys::{ArgList, Event, Locator, Task};

type Respond = dyn Fn(&TestingRequest) -> Result<TestingResponse, PoolError> + Send + Sync;

/// Stands in for the sandbox pool: answers from a closure and counts
/// dispatches.
pub struct ScriptedInvoker {
    respond: Box<Respond>,
    dispatches: AtomicUsize,
    requests: Mutex<Vec<TestingRequest>>,
}

impl ScriptedInvoker {
    pub fn new<F>(respond: F) -> Arc<Self>
    where
        F: Fn(&TestingRequest) -> Result<TestingResponse, PoolError> + Send + Sync + 'static,
    {
        Arc::new(Self {
            respond: Box::new(respond),
            dispatches: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Runs "student code" that sums its list arguments elementwise, unless
    /// the source mentions `broken`, in which case it returns zeros.
    pub fn elementwise() -> Arc<Self> {
        Self::new(|request| {
            let value = if request.source.contains("broken") {
                json!([0, 0, 0])
            } else {
                elementwise_sum(&request.args)
            };
            Ok(TestingResponse::ok(value))
        })
    }

    pub fn dispatches(&self) -> usize {
        self.dispatches.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<TestingRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Invoker for ScriptedInvoker {
    async fn invoke(&self, request: &TestingRequest) -> Result<Execution, PoolError> {
        self.dispatches.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        let response = (self.respond)(request)?;
        Ok(Execution {
            response,
            worker: WorkerSignature {
                id: "sandbox-0".into(),
                port: 65044,
            },
        })
    }
}

pub fn elementwise_sum(args: &[Value]) -> Value {
    let lists: Vec<&Vec<Value>> = args.iter().filter_map(Value::as_array).collect();
    let len = lists.iter().map(|l| l.len()).min().unwrap_or(0);
    let sums: Vec<f64> = (0..len)
        .map(|i| lists.iter().filter_map(|l| l[i].as_f64()).sum())
        .collect();
    json!(sums)
}

/// Records every progress callback.
pub struct RecordingSink<K> {
    pub events: Mutex<Vec<Progress<K>>>,
}

impl<K: Clone> RecordingSink<K> {
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
        }
    }

    pub fn steps(&self) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| matches!(e, Progress::Step(_)))
            .count()
    }

    pub fn finals(&self) -> Vec<Results<K>> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| match e {
                Progress::Done(all) => Some(all.clone()),
                Progress::Step(_) => None,
            })
            .collect()
    }
}

#[async_trait]
impl<K: Clone + Send + Sync> ProgressSink<K> for RecordingSink<K> {
    async fn step(&self, partial: &Results<K>) {
        self.events.lock().unwrap().push(Progress::Step(partial.clone()));
    }

    async fn done(&self, all: &Results<K>) {
        self.events.lock().unwrap().push(Progress::Done(all.clone()));
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

/// `add(p, q)`: elementwise sum, checked with a 1e-6 tolerance.
pub fn add_task() -> Task {
    Task::builder("add", Locator::function("add"))
        .checker(SequenceOf::ordered(CloseNumbers::new(1e-6)))
        .test(ArgList::new().arg(json!([3, 0, 2])).arg(json!([-1, 0, -2])))
        .test(ArgList::new().arg(json!([1.5, 2])).arg(json!([0.25, -2])))
        .solution(|call| {
            let args = call.args.args.clone();
            Ok(elementwise_sum(&args))
        })
        .time_limit(1.0)
        .build()
}

pub fn event_with(tasks: Vec<Task>) -> Event {
    let now = Utc::now();
    tasks.into_iter().fold(
        Event::new("week-1", "Week 1", now - Duration::days(1), now + Duration::days(6)),
        Event::with_task,
    )
}

pub const ADD_SOURCE: &str = "def add(p, q):\n    return [a + b for a, b in zip(p, q)]\n";
