use std::fmt;

use common::Verdict;
use invoker_pool::WorkerSignature;
use serde::Serialize;
use testsys::CheckResult;

/// The terminal outcome of one task.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JudgeResult {
    pub verdict: Verdict,
    pub cause: Option<String>,
    /// Last sandbox a test of this task was dispatched to.
    pub worker: Option<WorkerSignature>,
}

impl JudgeResult {
    pub fn new(verdict: Verdict, cause: Option<String>) -> Self {
        Self {
            verdict,
            cause,
            worker: None,
        }
    }

    pub fn ok() -> Self {
        Self::new(Verdict::Correct, None)
    }

    pub fn missing() -> Self {
        Self::new(Verdict::Missing, None)
    }

    pub fn fail(verdict: Verdict, cause: impl Into<String>) -> Self {
        Self::new(verdict, Some(cause.into()))
    }

    pub fn check_failed(cause: impl Into<String>) -> Self {
        Self::fail(Verdict::CheckFailed, cause)
    }

    pub fn with_worker(mut self, worker: Option<WorkerSignature>) -> Self {
        self.worker = worker;
        self
    }

    pub fn is_ok(&self) -> bool {
        self.verdict.is_correct()
    }

    /// Worker identity in the shape the run store keeps it.
    pub fn invoker(&self) -> Option<(String, u16)> {
        self.worker.as_ref().map(|w| (w.id.clone(), w.port))
    }
}

impl From<CheckResult> for JudgeResult {
    fn from(result: CheckResult) -> Self {
        Self::new(result.verdict, result.cause)
    }
}

impl fmt::Display for JudgeResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.cause {
            Some(cause) => write!(f, "{}: {}", self.verdict, cause),
            None => write!(f, "{}", self.verdict),
        }
    }
}
