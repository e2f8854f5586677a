use std::sync::Arc;

use common::Verdict;
use serde_json::Value;

use super::{render, CheckResult, Checker, ExtendedInfo};
use crate::generate::Arguments;

/// Elementwise check of a list, by default after sorting both sides by their
/// canonical JSON text.
#[derive(Clone)]
pub struct SequenceOf {
    item: Arc<dyn Checker>,
    sorted: bool,
}

impl SequenceOf {
    pub fn new(item: impl Checker + 'static) -> Self {
        Self {
            item: Arc::new(item),
            sorted: true,
        }
    }

    /// Compares positions as produced.
    pub fn ordered(item: impl Checker + 'static) -> Self {
        Self {
            item: Arc::new(item),
            sorted: false,
        }
    }
}

fn canonical_order(values: &[Value]) -> Vec<&Value> {
    let mut keyed: Vec<(String, &Value)> = values.iter().map(|v| (v.to_string(), v)).collect();
    keyed.sort_by(|a, b| a.0.cmp(&b.0));
    keyed.into_iter().map(|(_, v)| v).collect()
}

impl Checker for SequenceOf {
    fn check(
        &self,
        input: &Arguments,
        output: &Value,
        answer: &Value,
        info: &ExtendedInfo,
    ) -> CheckResult {
        let Value::Array(produced) = output else {
            return CheckResult::fail(
                Verdict::InvalidAnswer,
                format!("expected a list, got '{}'", render(output)),
            );
        };
        let Value::Array(expected) = answer else {
            return CheckResult::fail(Verdict::CheckFailed, "reference answer is not a list");
        };
        if produced.len() != expected.len() {
            return CheckResult::fail(
                Verdict::WrongAnswer,
                format!(
                    "expected a list of size {}, got {}",
                    expected.len(),
                    produced.len()
                ),
            );
        }

        let pairs: Vec<(&Value, &Value)> = if self.sorted {
            canonical_order(produced)
                .into_iter()
                .zip(canonical_order(expected))
                .collect()
        } else {
            produced.iter().zip(expected.iter()).collect()
        };
        for (i, (out, ans)) in pairs.into_iter().enumerate() {
            let result = self.item.check(input, out, ans, info);
            if !result.is_ok() {
                return result.prefixed(&format!("on position {}: ", i + 1));
            }
        }
        CheckResult::ok()
    }
}

/// Every produced pair must match some expected pair under the key and value
/// checkers.
#[derive(Clone)]
pub struct DictOf {
    key: Arc<dyn Checker>,
    value: Arc<dyn Checker>,
}

impl DictOf {
    pub fn new(key: impl Checker + 'static, value: impl Checker + 'static) -> Self {
        Self {
            key: Arc::new(key),
            value: Arc::new(value),
        }
    }
}

impl Checker for DictOf {
    fn check(
        &self,
        input: &Arguments,
        output: &Value,
        answer: &Value,
        info: &ExtendedInfo,
    ) -> CheckResult {
        let Value::Object(produced) = output else {
            return CheckResult::fail(
                Verdict::InvalidAnswer,
                format!("expected a dict, got '{}'", render(output)),
            );
        };
        let Value::Object(expected) = answer else {
            return CheckResult::fail(Verdict::CheckFailed, "reference answer is not a dict");
        };
        if produced.len() != expected.len() {
            return CheckResult::fail(
                Verdict::WrongAnswer,
                format!(
                    "expected a dict of size {}, got {}",
                    expected.len(),
                    produced.len()
                ),
            );
        }

        for (k1, v1) in produced {
            let key1 = Value::String(k1.clone());
            let matched = expected.iter().any(|(k2, v2)| {
                let key2 = Value::String(k2.clone());
                self.key.check(input, &key1, &key2, info).is_ok()
                    && self.value.check(input, v1, v2, info).is_ok()
            });
            if !matched {
                return CheckResult::fail(
                    Verdict::WrongAnswer,
                    format!("no matching pair for ({k1}: {}) in answer", render(v1)),
                );
            }
        }
        CheckResult::ok()
    }
}

/// Accepts when any alternative accepts.
#[derive(Clone, Default)]
pub struct EitherOf {
    alternatives: Vec<Arc<dyn Checker>>,
}

impl EitherOf {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn or(mut self, checker: impl Checker + 'static) -> Self {
        self.alternatives.push(Arc::new(checker));
        self
    }
}

impl Checker for EitherOf {
    fn check(
        &self,
        input: &Arguments,
        output: &Value,
        answer: &Value,
        info: &ExtendedInfo,
    ) -> CheckResult {
        let mut causes = Vec::with_capacity(self.alternatives.len());
        for checker in &self.alternatives {
            let result = checker.check(input, output, answer, info);
            if result.is_ok() {
                return result;
            }
            causes.push(result.cause.unwrap_or_default());
        }
        CheckResult::fail(
            Verdict::WrongAnswer,
            format!(
                "neither of specified checkers accepted the value: {}",
                causes.join(", ")
            ),
        )
    }
}

/// Adds the offending input to failure causes.
#[derive(Clone)]
pub struct Verbose {
    inner: Arc<dyn Checker>,
}

impl Verbose {
    pub fn new(inner: impl Checker + 'static) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }
}

impl Checker for Verbose {
    fn check(
        &self,
        input: &Arguments,
        output: &Value,
        answer: &Value,
        info: &ExtendedInfo,
    ) -> CheckResult {
        let result = self.inner.check(input, output, answer, info);
        if result.is_ok() {
            return result;
        }
        let cause = result.cause.unwrap_or_default();
        CheckResult {
            verdict: result.verdict,
            cause: Some(format!("{cause} (on input {input})")),
        }
    }
}

type CheckFn = dyn Fn(&Arguments, &Value, &Value, &ExtendedInfo) -> CheckResult + Send + Sync;

/// A one-off checker from a closure, for task-specific rules.
#[derive(Clone)]
pub struct FnChecker(Arc<CheckFn>);

impl FnChecker {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Arguments, &Value, &Value, &ExtendedInfo) -> CheckResult + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }
}

impl Checker for FnChecker {
    fn check(
        &self,
        input: &Arguments,
        output: &Value,
        answer: &Value,
        info: &ExtendedInfo,
    ) -> CheckResult {
        (self.0)(input, output, answer, info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::{single_float_6, single_number, single_string};
    use serde_json::json;

    fn run(checker: &dyn Checker, output: Value, answer: Value) -> CheckResult {
        checker.check(
            &Arguments::positional([json!([3, 0, 2]), json!([-1, 0, -2])]),
            &output,
            &answer,
            &ExtendedInfo::new(),
        )
    }

    #[test]
    fn elementwise_sum_scenario() {
        let checker = SequenceOf::ordered(single_float_6());
        assert!(run(&checker, json!([2, 0, 0]), json!([2.0, 0.0, 0.0])).is_ok());
    }

    #[test]
    fn sequences_report_size_and_position() {
        let unordered = SequenceOf::new(single_number());
        assert!(run(&unordered, json!([3, 1, 2]), json!([1, 2, 3])).is_ok());

        let ordered = SequenceOf::ordered(single_number());
        let r = run(&ordered, json!([1, 5]), json!([1, 2]));
        assert_eq!(r.cause.as_deref(), Some("on position 2: expected '2', got '5'"));

        let r = run(&ordered, json!([1]), json!([1, 2]));
        assert_eq!(r.cause.as_deref(), Some("expected a list of size 2, got 1"));

        assert_eq!(
            run(&ordered, json!("[1]"), json!([1])).verdict,
            Verdict::InvalidAnswer
        );
    }

    #[test]
    fn dicts_match_pairs_under_sub_checkers() {
        let checker = DictOf::new(single_string(), single_float_6());
        assert!(run(&checker, json!({"a": 1.0, "b": 2}), json!({"b": 2.0, "a": 1})).is_ok());

        let r = run(&checker, json!({"a": 1.5}), json!({"a": 1}));
        assert_eq!(r.cause.as_deref(), Some("no matching pair for (a: 1.5) in answer"));
    }

    #[test]
    fn either_of_collects_every_cause() {
        let checker = EitherOf::new().or(single_string()).or(SequenceOf::new(single_number()));
        assert!(run(&checker, json!([2, 1]), json!([1, 2])).is_ok());

        let r = run(&checker, json!(7), json!("7"));
        assert_eq!(r.verdict, Verdict::WrongAnswer);
        assert_eq!(
            r.cause.as_deref(),
            Some("neither of specified checkers accepted the value: expected a string, got 'int', expected a list, got '7'")
        );
    }

    #[test]
    fn verbose_names_the_input() {
        let r = run(&Verbose::new(single_number()), json!(1), json!(2));
        assert_eq!(
            r.cause.as_deref(),
            Some("expected '2', got '1' (on input ([3,0,2], [-1,0,-2]))")
        );
    }

    #[test]
    fn closures_see_extended_info() {
        let checker = FnChecker::new(|_, _, _, info| match info.get("student_id") {
            Some(_) => CheckResult::ok(),
            None => CheckResult::fail(Verdict::CheckFailed, "no student"),
        });
        let mut info = ExtendedInfo::new();
        info.insert("student_id".into(), json!(42));
        assert!(checker
            .check(&Arguments::default(), &json!(0), &json!(0), &info)
            .is_ok());
        assert!(!checker
            .check(&Arguments::default(), &json!(0), &json!(0), &ExtendedInfo::new())
            .is_ok());
    }
}
