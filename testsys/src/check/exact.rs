use common::Verdict;
use serde_json::Value;

use super::{render, same_value, CheckResult, Checker, ExtendedInfo};
use crate::generate::Arguments;

/// JSON shape a produced value must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Bool,
    Number,
    Integer,
    String,
    List,
    Dict,
    Null,
}

impl ValueKind {
    pub fn of(value: &Value) -> ValueKind {
        match value {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::Number(n) if n.is_i64() || n.is_u64() => ValueKind::Integer,
            Value::Number(_) => ValueKind::Number,
            Value::String(_) => ValueKind::String,
            Value::Array(_) => ValueKind::List,
            Value::Object(_) => ValueKind::Dict,
        }
    }

    pub fn admits(&self, value: &Value) -> bool {
        match self {
            ValueKind::Number => value.is_number(),
            kind => *kind == ValueKind::of(value),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ValueKind::Bool => "bool",
            ValueKind::Number => "number",
            ValueKind::Integer => "int",
            ValueKind::String => "string",
            ValueKind::List => "list",
            ValueKind::Dict => "dict",
            ValueKind::Null => "none",
        }
    }
}

/// Type check followed by equality.
#[derive(Debug, Clone, Copy)]
pub struct Exact {
    kind: ValueKind,
}

impl Exact {
    pub fn new(kind: ValueKind) -> Self {
        Self { kind }
    }
}

impl Checker for Exact {
    fn check(&self, _: &Arguments, output: &Value, answer: &Value, _: &ExtendedInfo) -> CheckResult {
        if !self.kind.admits(output) {
            return CheckResult::fail(
                Verdict::InvalidAnswer,
                format!(
                    "expected a {}, got '{}'",
                    self.kind.name(),
                    ValueKind::of(output).name()
                ),
            );
        }
        if !same_value(output, answer) {
            return CheckResult::fail(
                Verdict::WrongAnswer,
                format!("expected '{}', got '{}'", render(answer), render(output)),
            );
        }
        CheckResult::ok()
    }
}

/// Numbers equal within `delta`.
#[derive(Debug, Clone, Copy)]
pub struct CloseNumbers {
    delta: f64,
}

impl CloseNumbers {
    pub fn new(delta: f64) -> Self {
        Self { delta }
    }
}

impl Checker for CloseNumbers {
    fn check(&self, _: &Arguments, output: &Value, answer: &Value, _: &ExtendedInfo) -> CheckResult {
        let Some(produced) = output.as_f64() else {
            return CheckResult::fail(
                Verdict::InvalidAnswer,
                format!("expected a number, got '{}'", render(output)),
            );
        };
        let Some(expected) = answer.as_f64() else {
            return CheckResult::fail(
                Verdict::CheckFailed,
                format!("reference answer '{}' is not a number", render(answer)),
            );
        };
        if (produced - expected).abs() > self.delta {
            return CheckResult::fail(
                Verdict::WrongAnswer,
                format!("expected '{}', got '{}'", render(answer), render(output)),
            );
        }
        CheckResult::ok()
    }
}

pub fn single_bool() -> Exact {
    Exact::new(ValueKind::Bool)
}

pub fn single_number() -> Exact {
    Exact::new(ValueKind::Number)
}

pub fn single_string() -> Exact {
    Exact::new(ValueKind::String)
}

pub fn single_float_6() -> CloseNumbers {
    CloseNumbers::new(1e-6)
}

pub fn single_float_4() -> CloseNumbers {
    CloseNumbers::new(1e-4)
}
