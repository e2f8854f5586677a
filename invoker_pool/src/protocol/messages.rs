use common::Verdict;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

fn default_time_limit() -> f64 {
    1.0
}

/// One test execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestingRequest {
    /// Python source of a decorator applied to the located function.
    #[serde(default)]
    pub executor: Option<String>,
    pub source: String,
    pub args: Vec<Value>,
    #[serde(default)]
    pub kwargs: Map<String, Value>,
    /// Seconds.
    #[serde(default = "default_time_limit")]
    pub time_limit: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestingResponse {
    pub verdict: Verdict,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl TestingResponse {
    pub fn ok(value: Value) -> Self {
        Self {
            verdict: Verdict::Correct,
            message: None,
            value: Some(value),
        }
    }

    pub fn fail(verdict: Verdict, message: impl Into<String>) -> Self {
        Self {
            verdict,
            message: Some(message.into()),
            value: None,
        }
    }

    pub fn check_failed(message: impl Into<String>) -> Self {
        Self::fail(Verdict::CheckFailed, message)
    }

    /// The produced value; a function returning nothing yields `null`.
    pub fn value(&self) -> Value {
        self.value.clone().unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_defaults_fill_optional_fields() {
        let request: TestingRequest =
            serde_json::from_value(json!({"source": "def f(): pass", "args": []})).unwrap();
        assert_eq!(request.executor, None);
        assert!(request.kwargs.is_empty());
        assert_eq!(request.time_limit, 1.0);
    }

    #[test]
    fn responses_use_verdict_tags() {
        let wire = serde_json::to_value(TestingResponse::fail(Verdict::TimeLimitExceeded, "slow"))
            .unwrap();
        assert_eq!(wire, json!({"verdict": "TL", "message": "slow"}));

        let back: TestingResponse =
            serde_json::from_value(json!({"verdict": "OK", "value": null})).unwrap();
        assert_eq!(back.value(), Value::Null);
    }
}
