//! The judging flow of one task as pipeline steps.
//!
//! ```text
//! Validation -> Generation -> for each test:
//!     RunningModel -> Preparing -> Judging -> Checking
//! ```
//!
//! Every step that reaches a terminal non-`OK` outcome writes it to
//! [`result`] and stops; the remaining tests are skipped.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use async_trait::async_trait;
use common::Verdict;
use invoker_pool::{Invoker, PoolError, TestingRequest, TestingResponse, WorkerSignature};
use pipeline::{
    Artefact, ArtefactCollection, ArtefactKey, ArtefactStore, Flow, ForEach, Pipeline,
    PipelineError, Step, StoreExt,
};
use serde_json::Value;
use testsys::generate::seeded;
use testsys::{Arguments, CodeUnit, Invocation, Solution, Task};
use tracing::{debug, warn};

use crate::result::JudgeResult;

/// The unit under test and whose it is.
#[derive(Debug, Clone)]
pub struct TaskSubmission {
    pub task: Arc<Task>,
    pub unit: CodeUnit,
    pub author: String,
}

/// A generated test with its 1-based position.
#[derive(Debug, Clone, PartialEq)]
pub struct TestInput {
    pub number: usize,
    pub args: Arguments,
}

impl TestInput {
    fn prefix(&self) -> String {
        format!("[test {}] ", self.number)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TestingResult {
    pub response: TestingResponse,
    pub worker: WorkerSignature,
}

pub const TEST_GROUP: &str = "test";

pub fn submission() -> Artefact<TaskSubmission> {
    Artefact::new("@testing/submission")
}

pub fn reference() -> Artefact<Option<Solution>> {
    Artefact::new("@testing/reference")
}

/// Includes plus the located unit, as sent to the sandbox.
pub fn code() -> Artefact<String> {
    Artefact::new("@testing/code")
}

pub fn tests() -> ArtefactCollection<TestInput> {
    ArtefactCollection::grouped("@testing/tests", TEST_GROUP)
}

pub fn expected_values() -> ArtefactCollection<Value> {
    ArtefactCollection::grouped("@testing/expected_values", TEST_GROUP)
}

pub fn judge_requests() -> ArtefactCollection<TestingRequest> {
    ArtefactCollection::grouped("@testing/judge_requests", TEST_GROUP)
}

pub fn testing_results() -> ArtefactCollection<TestingResult> {
    ArtefactCollection::grouped("@testing/testing_results", TEST_GROUP)
}

pub fn result() -> Artefact<JudgeResult> {
    Artefact::new("@testing/result")
}

fn keys<const N: usize>(keys: [&ArtefactKey; N]) -> Vec<ArtefactKey> {
    keys.into_iter().cloned().collect()
}

/// Replaces the task result, keeping the worker already recorded, and stops.
fn conclude(store: &mut dyn ArtefactStore, outcome: JudgeResult) -> Result<Flow, PipelineError> {
    let current = store.get_mut(&result())?;
    let worker = outcome.worker.clone().or_else(|| current.worker.take());
    *current = outcome.with_worker(worker);
    Ok(Flow::Stop)
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Applies the task's validator to the unit.
pub struct Validation;

#[async_trait]
impl Step for Validation {
    fn name(&self) -> &str {
        "validation"
    }

    fn needs(&self) -> Vec<ArtefactKey> {
        keys([submission().key()])
    }

    fn produces(&self) -> Vec<ArtefactKey> {
        keys([result().key()])
    }

    async fn process(&self, store: &mut dyn ArtefactStore) -> Result<Flow, PipelineError> {
        let submission = store.get(&submission())?;
        match submission.task.validator.validate(&submission.unit) {
            None => {
                store.set(&result(), JudgeResult::ok())?;
                Ok(Flow::Continue)
            }
            Some(message) => {
                debug!(task = %submission.task.id, "validation failed: {}", message);
                store.set(&result(), JudgeResult::fail(Verdict::ValidationError, message))?;
                Ok(Flow::Stop)
            }
        }
    }
}

/// Draws the test list from a seeded source and fixes the code to send.
pub struct Generation {
    seed: u64,
}

impl Generation {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }
}

#[async_trait]
impl Step for Generation {
    fn name(&self) -> &str {
        "generation"
    }

    fn needs(&self) -> Vec<ArtefactKey> {
        keys([submission().key()])
    }

    fn produces(&self) -> Vec<ArtefactKey> {
        keys([tests().key(), reference().key(), code().key()])
    }

    async fn process(&self, store: &mut dyn ArtefactStore) -> Result<Flow, PipelineError> {
        let submission = store.get(&submission())?;
        let task = Arc::clone(&submission.task);
        let source = task.prepare_source(&submission.unit);

        let mut rng = seeded(self.seed);
        let inputs = task
            .generate_tests(&mut rng)
            .into_iter()
            .enumerate()
            .map(|(i, args)| TestInput { number: i + 1, args })
            .collect::<Vec<_>>();
        debug!(task = %task.id, tests = inputs.len(), seed = self.seed, "tests generated");

        store.set_collection(&tests(), inputs)?;
        store.set(&reference(), task.reference())?;
        store.set(&code(), source)?;
        Ok(Flow::Continue)
    }
}

/// Computes the expected value with the trusted reference solution. A
/// failure there is the judge's fault.
pub struct RunningModel;

#[async_trait]
impl Step for RunningModel {
    fn name(&self) -> &str {
        "running-model"
    }

    fn needs(&self) -> Vec<ArtefactKey> {
        keys([reference().key(), tests().item().key(), result().key()])
    }

    fn produces(&self) -> Vec<ArtefactKey> {
        keys([expected_values().item().key()])
    }

    async fn process(&self, store: &mut dyn ArtefactStore) -> Result<Flow, PipelineError> {
        let test = store.get(&tests().item())?.clone();
        let expected = match store.get(&reference())? {
            None => Ok(Value::Null),
            Some(solution) => {
                let solution = Arc::clone(solution);
                let mut invocation = Invocation::new(test.args.clone());
                catch_unwind(AssertUnwindSafe(|| solution(&mut invocation)))
                    .unwrap_or_else(|panic| Err(panic_message(panic.as_ref())))
            }
        };

        match expected {
            Ok(value) => {
                store.set(&expected_values().item(), value)?;
                Ok(Flow::Continue)
            }
            Err(e) => {
                warn!(test = test.number, "reference solution failed: {}", e);
                conclude(
                    store,
                    JudgeResult::check_failed(format!(
                        "{}error while running correct solution: {}",
                        test.prefix(),
                        e
                    )),
                )
            }
        }
    }
}

/// Builds the wire request for the current test.
pub struct Preparing;

#[async_trait]
impl Step for Preparing {
    fn name(&self) -> &str {
        "preparing"
    }

    fn needs(&self) -> Vec<ArtefactKey> {
        keys([submission().key(), code().key(), tests().item().key()])
    }

    fn produces(&self) -> Vec<ArtefactKey> {
        keys([judge_requests().item().key()])
    }

    async fn process(&self, store: &mut dyn ArtefactStore) -> Result<Flow, PipelineError> {
        let task = Arc::clone(&store.get(&submission())?.task);
        let test = store.get(&tests().item())?;
        let request = TestingRequest {
            executor: task.executor.as_ref().map(|e| e.source.clone()),
            source: store.get(&code())?.clone(),
            args: test.args.args.clone(),
            kwargs: test.args.kwargs.clone(),
            time_limit: task.time_limit,
        };
        store.set(&judge_requests().item(), request)?;
        Ok(Flow::Continue)
    }
}

/// Sends the request to a sandbox. A non-`OK` sandbox verdict ends the task
/// as reported.
pub struct Judging {
    invoker: Arc<dyn Invoker>,
}

impl Judging {
    pub fn new(invoker: Arc<dyn Invoker>) -> Self {
        Self { invoker }
    }
}

#[async_trait]
impl Step for Judging {
    fn name(&self) -> &str {
        "judging"
    }

    fn needs(&self) -> Vec<ArtefactKey> {
        keys([judge_requests().item().key(), tests().item().key(), result().key()])
    }

    fn produces(&self) -> Vec<ArtefactKey> {
        keys([testing_results().item().key()])
    }

    async fn process(&self, store: &mut dyn ArtefactStore) -> Result<Flow, PipelineError> {
        let request = store.get(&judge_requests().item())?.clone();
        let prefix = store.get(&tests().item())?.prefix();

        let execution = match self.invoker.invoke(&request).await {
            Ok(execution) => execution,
            Err(PoolError::FailedSandbox { id, port, .. }) => {
                let worker = WorkerSignature { id, port };
                let cause = format!("{prefix}invoker {worker} failed");
                return conclude(store, JudgeResult::check_failed(cause).with_worker(Some(worker)));
            }
            Err(e) => {
                return conclude(store, JudgeResult::check_failed(format!("{prefix}{e}")));
            }
        };

        store.get_mut(&result())?.worker = Some(execution.worker.clone());
        let response = execution.response.clone();
        store.set(
            &testing_results().item(),
            TestingResult {
                response: execution.response,
                worker: execution.worker,
            },
        )?;

        if response.verdict.is_correct() {
            return Ok(Flow::Continue);
        }
        let cause = format!("{}{}", prefix, response.message.unwrap_or_default());
        conclude(store, JudgeResult::fail(response.verdict, cause))
    }
}

/// Compares the produced value against the expected one.
pub struct Checking;

#[async_trait]
impl Step for Checking {
    fn name(&self) -> &str {
        "checking"
    }

    fn needs(&self) -> Vec<ArtefactKey> {
        keys([
            submission().key(),
            tests().item().key(),
            expected_values().item().key(),
            testing_results().item().key(),
            result().key(),
        ])
    }

    fn produces(&self) -> Vec<ArtefactKey> {
        Vec::new()
    }

    async fn process(&self, store: &mut dyn ArtefactStore) -> Result<Flow, PipelineError> {
        let submission = store.get(&submission())?;
        let task = Arc::clone(&submission.task);
        let info = task.checker_info(Some(submission.author.as_str()));
        let test = store.get(&tests().item())?;
        let prefix = test.prefix();
        let output = store.get(&testing_results().item())?.response.value();
        let answer = store.get(&expected_values().item())?;

        let checked = task.checker.check(&test.args, &output, answer, &info);
        if checked.is_ok() {
            return Ok(Flow::Continue);
        }
        conclude(store, JudgeResult::from(checked.prefixed(&prefix)))
    }
}

/// Assembles the testing pipeline for one task run.
pub fn testing_pipeline(invoker: Arc<dyn Invoker>, seed: u64) -> Result<Pipeline, PipelineError> {
    let per_test = Pipeline::new(keys([
        submission().key(),
        reference().key(),
        code().key(),
        tests().item().key(),
        result().key(),
    ]))
    .then(RunningModel)?
    .then(Preparing)?
    .then(Judging::new(invoker))?
    .then(Checking)?;

    Pipeline::new(keys([submission().key()]))
        .then(Validation)?
        .then(Generation::new(seed))?
        .then(ForEach::new("testing", &tests(), per_test))
}
