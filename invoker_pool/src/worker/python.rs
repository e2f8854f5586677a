use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use common::Verdict;
use serde_json::{json, Value};
use tempfile::tempdir;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{info, warn};

use super::ExecutionBackend;
use crate::protocol::{TestingRequest, TestingResponse};

/// Runs inside the interpreter: locates the first function, applies the
/// executor, calls it, and writes the outcome as JSON. The in-process alarm
/// enforces the time limit; the backend's kill is the backstop.
const HARNESS: &str = r#"
import ast
import json
import signal
import sys


class _TimeLimit(BaseException):
    pass


def _expire(signum, frame):
    raise _TimeLimit()


def _first_function(tree):
    for node in ast.walk(tree):
        if isinstance(node, ast.FunctionDef):
            return node.name
    return None


def main(request_path, result_path):
    with open(request_path) as f:
        request = json.load(f)

    source = request["source"]
    executor = request.get("executor")
    try:
        fn_name = _first_function(ast.parse(source))
        if executor and fn_name:
            ex_name = _first_function(ast.parse(executor))
            source = "\n".join([source, executor, f"{fn_name} = {ex_name}({fn_name})"])
        code = compile(source, "<submission>", "exec")
    except SyntaxError as e:
        result = {"verdict": "CE", "message": f"could not compile: '{e}'"}
    else:
        if fn_name is None:
            result = {"verdict": "RE", "message": "no function definition found"}
        else:
            result = _run(code, fn_name, request)

    with open(result_path, "w") as f:
        json.dump(result, f)


def _run(code, fn_name, request):
    namespace = {"__name__": "__submission__"}
    signal.signal(signal.SIGALRM, _expire)
    signal.setitimer(signal.ITIMER_REAL, float(request.get("time_limit", 1)))
    try:
        try:
            exec(code, namespace)
        except _TimeLimit:
            raise
        except BaseException as e:
            return {"verdict": "RE", "message": f"could not compile: '{e}'"}
        try:
            value = namespace[fn_name](*request.get("args", []), **request.get("kwargs", {}))
        except _TimeLimit:
            raise
        except BaseException as e:
            return {"verdict": "RE", "message": f"runtime error '{e}'"}
    except _TimeLimit:
        return {"verdict": "TL"}
    finally:
        signal.setitimer(signal.ITIMER_REAL, 0)

    try:
        json.dumps(value)
    except (TypeError, ValueError) as e:
        return {"verdict": "IA", "message": f"result is not serializable: '{e}'"}
    return {"verdict": "OK", "value": value}


if __name__ == "__main__":
    main(sys.argv[1], sys.argv[2])
"#;

/// Grace on top of the time limit for interpreter startup before the process
/// is killed from outside.
const STARTUP_GRACE: Duration = Duration::from_secs(1);

/// Executes submissions with a local Python interpreter in a scratch
/// directory.
#[derive(Debug, Clone)]
pub struct PythonBackend {
    python: String,
}

impl PythonBackend {
    pub fn new(python: impl Into<String>) -> Self {
        Self {
            python: python.into(),
        }
    }

    pub fn from_config() -> Self {
        Self::new(common::config::python_binary())
    }

    fn time_limit_exceeded(limit: f64) -> TestingResponse {
        TestingResponse::fail(
            Verdict::TimeLimitExceeded,
            format!("took more than {limit}s to complete"),
        )
    }

    async fn run(&self, request: &TestingRequest) -> Result<TestingResponse, String> {
        let scratch = tempdir().map_err(|e| format!("failed to create scratch dir: {e}"))?;
        let harness = scratch.path().join("harness.py");
        let request_path = scratch.path().join("request.json");
        let result_path = scratch.path().join("result.json");

        let payload = json!({
            "source": request.source,
            "executor": request.executor,
            "args": request.args,
            "kwargs": request.kwargs,
            "time_limit": request.time_limit,
        });
        tokio::fs::write(&harness, HARNESS)
            .await
            .map_err(|e| format!("failed to write harness: {e}"))?;
        tokio::fs::write(&request_path, payload.to_string())
            .await
            .map_err(|e| format!("failed to write request: {e}"))?;

        let child = Command::new(&self.python)
            .arg(&harness)
            .arg(&request_path)
            .arg(&result_path)
            .current_dir(scratch.path())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| format!("failed to start {}: {}", self.python, e))?;

        let limit = Duration::from_secs_f64(request.time_limit.max(0.0)) + STARTUP_GRACE;
        let output = match timeout(limit, child.wait_with_output()).await {
            Ok(output) => output.map_err(|e| format!("failed to wait for interpreter: {e}"))?,
            Err(_) => {
                info!("Solution timed out, process killed");
                return Ok(Self::time_limit_exceeded(request.time_limit));
            }
        };

        let raw = match tokio::fs::read_to_string(&result_path).await {
            Ok(raw) => raw,
            Err(_) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                let tail: String = stderr.lines().rev().take(5).collect::<Vec<_>>().join(" | ");
                return Ok(TestingResponse::fail(
                    Verdict::RuntimeError,
                    format!("runtime error 'interpreter exited with {}: {}'", output.status, tail),
                ));
            }
        };

        let mut response: TestingResponse =
            serde_json::from_str(&raw).map_err(|e| format!("unreadable harness result: {e}"))?;
        if response.verdict == Verdict::TimeLimitExceeded {
            response = Self::time_limit_exceeded(request.time_limit);
        }
        if response.verdict == Verdict::Correct && response.value.is_none() {
            response.value = Some(Value::Null);
        }
        Ok(response)
    }
}

#[async_trait]
impl ExecutionBackend for PythonBackend {
    async fn execute(&self, request: TestingRequest) -> TestingResponse {
        match self.run(&request).await {
            Ok(response) => response,
            Err(message) => {
                warn!("{}", message);
                TestingResponse::check_failed(message)
            }
        }
    }
}
