//! Task definitions: what to locate, how to validate, test and check it.

use std::fmt;
use std::sync::Arc;

use rand::rngs::StdRng;
use serde_json::Value;

use crate::check::{single_number, Checker, ExtendedInfo};
use crate::generate::{Arguments, TestCase};
use crate::source::{CodeUnit, Locator};
use crate::validate::Validator;

/// Call context of a reference solution.
#[derive(Debug, Clone, Default)]
pub struct Invocation {
    pub args: Arguments,
    /// Text the solution "printed".
    pub stdout: String,
}

impl Invocation {
    pub fn new(args: Arguments) -> Self {
        Self {
            args,
            stdout: String::new(),
        }
    }

    /// Appends a line to `stdout`, like Python's `print`.
    pub fn print(&mut self, text: impl fmt::Display) {
        self.stdout.push_str(&text.to_string());
        self.stdout.push('\n');
    }

    pub fn arg(&self, index: usize) -> Option<&Value> {
        self.args.args.get(index)
    }
}

/// Trusted reference implementation. Never given submitted code.
pub type Solution = Arc<dyn Fn(&mut Invocation) -> Result<Value, String> + Send + Sync>;

pub fn solution<F>(f: F) -> Solution
where
    F: Fn(&mut Invocation) -> Result<Value, String> + Send + Sync + 'static,
{
    Arc::new(f)
}

type Wrap = Arc<dyn Fn(Solution) -> Solution + Send + Sync>;

/// A wrapper applied both to the reference solution (natively) and to the
/// submitted function (as Python source the sandbox applies).
#[derive(Clone)]
pub struct Executor {
    pub name: String,
    pub source: String,
    wrap: Wrap,
}

const SUBSTITUTE_STDOUT: &str = r#"def substitute_stdout(fn):
    import contextlib
    import io

    def wrapped(*args, **kwargs):
        with io.StringIO() as buffer, contextlib.redirect_stdout(buffer):
            fn(*args, **kwargs)
            return buffer.getvalue()

    return wrapped
"#;

impl Executor {
    pub fn new<F>(name: impl Into<String>, source: impl Into<String>, wrap: F) -> Self
    where
        F: Fn(Solution) -> Solution + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            source: source.into(),
            wrap: Arc::new(wrap),
        }
    }

    /// The function's result becomes whatever it printed.
    pub fn substitute_stdout() -> Self {
        Self::new("substitute_stdout", SUBSTITUTE_STDOUT, |inner: Solution| {
            solution(move |call: &mut Invocation| {
                call.stdout.clear();
                inner(call)?;
                Ok(Value::String(std::mem::take(&mut call.stdout)))
            })
        })
    }

    pub fn wrap(&self, solution: Solution) -> Solution {
        (self.wrap)(solution)
    }
}

impl fmt::Debug for Executor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Executor").field("name", &self.name).finish()
    }
}

pub struct Task {
    pub id: String,
    pub locator: Locator,
    /// Trusted helper code prepended to the submission before dispatch.
    pub include: Vec<CodeUnit>,
    pub validator: Validator,
    pub checker: Arc<dyn Checker>,
    pub tests: Vec<TestCase>,
    pub solution: Option<Solution>,
    pub statement: Option<String>,
    /// Seconds.
    pub time_limit: f64,
    pub executor: Option<Executor>,
    /// Whether the checker receives [`ExtendedInfo`] about the submitter.
    pub extended_info: bool,
}

impl Task {
    pub fn builder(id: impl Into<String>, locator: Locator) -> TaskBuilder {
        TaskBuilder::new(id.into(), locator)
    }

    pub fn generate_tests(&self, rng: &mut StdRng) -> Vec<Arguments> {
        self.tests.iter().map(|test| test.generate(rng)).collect()
    }

    /// The reference solution with the executor applied.
    pub fn reference(&self) -> Option<Solution> {
        let solution = self.solution.clone()?;
        Some(match &self.executor {
            Some(executor) => executor.wrap(solution),
            None => solution,
        })
    }

    /// Includes followed by the unit, as sent to the sandbox.
    pub fn prepare_source(&self, unit: &CodeUnit) -> String {
        let mut parts: Vec<&str> = self.include.iter().map(|inc| inc.source.as_str()).collect();
        parts.push(&unit.source);
        parts.join("\n\n")
    }

    /// Info for the checker, empty unless the task asks for it.
    pub fn checker_info(&self, student_id: Option<&str>) -> ExtendedInfo {
        let mut info = ExtendedInfo::new();
        if self.extended_info {
            if let Some(id) = student_id {
                info.insert("student_id".into(), Value::from(id));
            }
        }
        info
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("locator", &self.locator)
            .field("tests", &self.tests.len())
            .field("time_limit", &self.time_limit)
            .field("executor", &self.executor)
            .finish_non_exhaustive()
    }
}

pub struct TaskBuilder {
    task: Task,
}

impl TaskBuilder {
    fn new(id: String, locator: Locator) -> Self {
        Self {
            task: Task {
                id,
                locator,
                include: Vec::new(),
                validator: Validator::Accept,
                checker: Arc::new(single_number()),
                tests: Vec::new(),
                solution: None,
                statement: None,
                time_limit: common::config::default_time_limit_secs(),
                executor: None,
                extended_info: false,
            },
        }
    }

    pub fn include(mut self, unit: CodeUnit) -> Self {
        self.task.include.push(unit);
        self
    }

    pub fn validator(mut self, validator: Validator) -> Self {
        self.task.validator = validator;
        self
    }

    pub fn checker(mut self, checker: impl Checker + 'static) -> Self {
        self.task.checker = Arc::new(checker);
        self
    }

    pub fn test(mut self, test: impl Into<TestCase>) -> Self {
        self.task.tests.push(test.into());
        self
    }

    pub fn tests<I>(mut self, tests: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<TestCase>,
    {
        self.task.tests.extend(tests.into_iter().map(Into::into));
        self
    }

    pub fn solution<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut Invocation) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.task.solution = Some(solution(f));
        self
    }

    pub fn statement(mut self, markdown: impl Into<String>) -> Self {
        self.task.statement = Some(markdown.into());
        self
    }

    pub fn time_limit(mut self, seconds: f64) -> Self {
        self.task.time_limit = seconds;
        self
    }

    pub fn executor(mut self, executor: Executor) -> Self {
        self.task.executor = Some(executor);
        self
    }

    pub fn extended_info(mut self, enabled: bool) -> Self {
        self.task.extended_info = enabled;
        self
    }

    pub fn build(self) -> Task {
        self.task
    }
}
