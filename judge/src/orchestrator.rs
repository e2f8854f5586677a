//orchestrator.rs
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use common::Verdict;
use db::{NewRun, Run, RunStore};
use futures::FutureExt;
use invoker_pool::{AlertSink, Invoker, TracingAlerts};
use testsys::source::{parse_module, SyntaxError};
use testsys::{CodeUnit, Event, Task, TaskResolver};
use tracing::{error, info, warn};

use crate::progress::ProgressSink;
use crate::result::JudgeResult;
use crate::runner::Runner;
use crate::submission::Submission;
use crate::testing::panic_message;

/// Drives submissions through an event's tasks and records the runs.
#[derive(Clone)]
pub struct Orchestrator {
    invoker: Arc<dyn Invoker>,
    runs: Arc<dyn RunStore>,
    alerts: Arc<dyn AlertSink>,
    base_seed: u64,
}

impl Orchestrator {
    pub fn new(invoker: Arc<dyn Invoker>, runs: Arc<dyn RunStore>) -> Self {
        Self {
            invoker,
            runs,
            alerts: Arc::new(TracingAlerts),
            base_seed: common::config::judge_seed(),
        }
    }

    pub fn with_alerts(mut self, alerts: Arc<dyn AlertSink>) -> Self {
        self.alerts = alerts;
        self
    }

    pub fn with_seed(mut self, base_seed: u64) -> Self {
        self.base_seed = base_seed;
        self
    }

    /// Judges every task of `event` against `submission`, in task order.
    ///
    /// A task whose unit is not in the submission is `Missing` and is not
    /// recorded; every other task is recorded as a new run. `sink` sees the
    /// results after each task and once more at the end.
    pub async fn judge(
        &self,
        event: &Event,
        submission: &Submission,
        sink: &dyn ProgressSink<String>,
    ) -> BTreeMap<String, JudgeResult> {
        let mut results = BTreeMap::new();
        let report = submission.container.collect(&event.locators());
        for (cell, e) in &report.malformed {
            info!(author = %submission.author, cell, "Skipping malformed cell: {}", e);
        }
        for (locator, count) in &report.ignored_repeats {
            info!(author = %submission.author, "Ignored {} repeated definitions of {}", count, locator);
        }

        for task in &event.tasks {
            let Some(unit) = report.get(&task.locator) else {
                results.insert(task.id.clone(), JudgeResult::missing());
                sink.step(&results).await;
                continue;
            };

            let solution_hash = unit.fingerprint();
            let result = self
                .judge_task(task, unit, &solution_hash, &submission.author)
                .await;

            let run = NewRun {
                event_id: event.id.clone(),
                task_id: task.id.clone(),
                author: submission.author.clone(),
                solution_source: unit.source.clone(),
                solution_hash,
                verdict: result.verdict,
                comment: result.cause.clone().unwrap_or_default(),
                invoker: result.invoker(),
            };
            if let Err(e) = self.runs.create(run).await {
                error!(task = %task.id, author = %submission.author, "Failed to record run: {}", e);
            }

            results.insert(task.id.clone(), result);
            sink.step(&results).await;
        }

        sink.done(&results).await;
        results
    }

    /// Judges stored runs again against the current task definitions and
    /// overwrites their outcome in place. Runs whose task no longer resolves
    /// become `CheckFailed` with cause "task not found".
    pub async fn rejudge(
        &self,
        runs: Vec<Run>,
        resolver: &dyn TaskResolver,
        sink: &dyn ProgressSink<i64>,
    ) -> BTreeMap<i64, JudgeResult> {
        let mut results = BTreeMap::new();

        for mut run in runs {
            let result = match resolver.resolve(&run.event_id, &run.task_id) {
                None => {
                    warn!(run = run.id, task = %run.task_id, "Task not found for rejudge");
                    JudgeResult::check_failed("task not found")
                }
                Some(task) => match locate_stored(&task, &run.solution_source) {
                    Ok(unit) => {
                        self.judge_task(&task, &unit, &run.solution_hash, &run.author)
                            .await
                    }
                    Err(e) => JudgeResult::check_failed(format!("stored solution does not parse: {e}")),
                },
            };

            run.set_outcome(
                result.verdict,
                result.cause.clone().unwrap_or_default(),
                result.invoker(),
            );
            if let Err(e) = self.runs.save(&run).await {
                error!(run = run.id, "Failed to update run: {}", e);
            }

            results.insert(run.id, result);
            sink.step(&results).await;
        }

        sink.done(&results).await;
        results
    }

    async fn judge_task(
        &self,
        task: &Arc<Task>,
        unit: &CodeUnit,
        solution_hash: &str,
        author: &str,
    ) -> JudgeResult {
        let runner = Runner::new(Arc::clone(task), Arc::clone(&self.invoker)).with_seed(self.base_seed);
        let outcome = AssertUnwindSafe(runner.judge(unit, solution_hash, author))
            .catch_unwind()
            .await;

        let result = match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                error!(task = %task.id, "Testing pipeline misconfigured: {}", e);
                JudgeResult::check_failed(format!("testing pipeline failed: {e}"))
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!(task = %task.id, "Judging panicked: {}", message);
                JudgeResult::check_failed(format!("judge panicked: {message}"))
            }
        };

        if result.verdict == Verdict::CheckFailed {
            self.alerts.alert(&format!(
                "Check failed on task {} for {}: {}",
                task.id,
                author,
                result.cause.as_deref().unwrap_or("")
            ));
        }
        result
    }
}

/// Recovers the unit a run was judged on from its stored source.
fn locate_stored(task: &Task, source: &str) -> Result<CodeUnit, SyntaxError> {
    let module = parse_module(source)?;
    match module.walk().find(|node| task.locator.matches(node)) {
        Some(node) => CodeUnit::extract(source, node),
        None => CodeUnit::parse_function(source),
    }
}
