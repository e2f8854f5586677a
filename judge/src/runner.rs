use std::sync::Arc;

use invoker_pool::Invoker;
use pipeline::{PipelineError, StoreExt};
use sha2::{Digest, Sha256};
use testsys::{CodeUnit, Task};
use tracing::info;

use crate::result::JudgeResult;
use crate::testing::{result, submission, testing_pipeline, TaskSubmission};

/// Seed of a run's random source. The same solution of the same task always
/// sees the same tests, which keeps rejudging reproducible.
pub fn derive_seed(base: u64, task_id: &str, solution_hash: &str) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(base.to_be_bytes());
    hasher.update(task_id.as_bytes());
    hasher.update([0u8]);
    hasher.update(solution_hash.as_bytes());
    let digest = hasher.finalize();
    let mut seed = [0u8; 8];
    seed.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(seed)
}

/// Judges units against one task.
pub struct Runner {
    task: Arc<Task>,
    invoker: Arc<dyn Invoker>,
    base_seed: u64,
}

impl Runner {
    pub fn new(task: Arc<Task>, invoker: Arc<dyn Invoker>) -> Self {
        Self {
            task,
            invoker,
            base_seed: common::config::judge_seed(),
        }
    }

    pub fn with_seed(mut self, base_seed: u64) -> Self {
        self.base_seed = base_seed;
        self
    }

    pub fn task(&self) -> &Arc<Task> {
        &self.task
    }

    /// Runs the testing pipeline over `unit`. Errors are configuration
    /// problems of the pipeline itself; every judging outcome, including
    /// judge-side faults, is a [`JudgeResult`].
    pub async fn judge(
        &self,
        unit: &CodeUnit,
        solution_hash: &str,
        author: &str,
    ) -> Result<JudgeResult, PipelineError> {
        let seed = derive_seed(self.base_seed, &self.task.id, solution_hash);
        let pipeline = testing_pipeline(Arc::clone(&self.invoker), seed)?;

        let mut store = pipeline.artefactory();
        store.set(
            &submission(),
            TaskSubmission {
                task: Arc::clone(&self.task),
                unit: unit.clone(),
                author: author.to_string(),
            },
        )?;
        let completion = pipeline.process(&mut store).await?;

        let outcome = store.get(&result())?.clone();
        info!(
            task = %self.task.id,
            author,
            verdict = outcome.verdict.tag(),
            finished = completion.is_finished(),
            "Task judged"
        );
        Ok(outcome)
    }
}
