//! Verdict-producing comparators over `(input, output, answer)`.

mod combinators;
mod exact;

pub use combinators::{DictOf, EitherOf, FnChecker, SequenceOf, Verbose};
pub use exact::{
    single_bool, single_float_4, single_float_6, single_number, single_string, CloseNumbers,
    Exact, ValueKind,
};

use std::fmt;
use std::sync::Arc;

use common::Verdict;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::generate::Arguments;

/// Out-of-band context handed to checkers of tasks that ask for it, e.g.
/// `student_id`.
pub type ExtendedInfo = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    pub verdict: Verdict,
    pub cause: Option<String>,
}

impl CheckResult {
    pub fn ok() -> Self {
        Self {
            verdict: Verdict::Correct,
            cause: None,
        }
    }

    pub fn fail(verdict: Verdict, cause: impl Into<String>) -> Self {
        Self {
            verdict,
            cause: Some(cause.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.verdict.is_correct()
    }

    /// Prepends `prefix` to the cause.
    pub fn prefixed(mut self, prefix: &str) -> Self {
        self.cause = Some(format!("{prefix}{}", self.cause.unwrap_or_default()));
        self
    }
}

impl fmt::Display for CheckResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.cause {
            Some(cause) => write!(f, "{}: {}", self.verdict, cause),
            None => write!(f, "{}", self.verdict),
        }
    }
}

/// Stateless comparator. Anything a checker needs to remember across runs
/// must come in through `info`.
pub trait Checker: Send + Sync {
    fn check(
        &self,
        input: &Arguments,
        output: &Value,
        answer: &Value,
        info: &ExtendedInfo,
    ) -> CheckResult;
}

impl<C: Checker + ?Sized> Checker for Arc<C> {
    fn check(
        &self,
        input: &Arguments,
        output: &Value,
        answer: &Value,
        info: &ExtendedInfo,
    ) -> CheckResult {
        (**self).check(input, output, answer, info)
    }
}

/// Values as they read in messages: strings without quotes, everything else
/// as JSON.
pub(crate) fn render(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Equality where `1` and `1.0` are the same number.
pub(crate) fn same_value(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x == y,
            _ => x.as_f64() == y.as_f64(),
        },
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| same_value(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(k, x)| ys.get(k).is_some_and(|y| same_value(x, y)))
        }
        _ => a == b,
    }
}
