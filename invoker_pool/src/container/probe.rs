use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::warn;

/// Liveness and log access for the process behind a worker slot.
#[async_trait]
pub trait SandboxProbe: Send + Sync {
    async fn is_running(&self, id: &str) -> bool;

    /// Recent output of the sandbox, for failure reports.
    async fn logs(&self, id: &str) -> String;
}

/// Probes Docker containers through the `docker` CLI.
#[derive(Debug, Clone)]
pub struct DockerProbe {
    binary: String,
    tail: usize,
    deadline: Duration,
}

impl DockerProbe {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            tail: 200,
            deadline: Duration::from_secs(10),
        }
    }

    pub fn from_config() -> Self {
        Self::new(common::config::docker_binary())
    }

    async fn docker(&self, args: &[&str]) -> Result<std::process::Output, String> {
        let child = Command::new(&self.binary)
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| format!("failed to spawn {}: {}", self.binary, e))?;

        timeout(self.deadline, child.wait_with_output())
            .await
            .map_err(|_| format!("{} {} timed out", self.binary, args.join(" ")))?
            .map_err(|e| format!("{} {} failed: {}", self.binary, args.join(" "), e))
    }
}

#[async_trait]
impl SandboxProbe for DockerProbe {
    async fn is_running(&self, id: &str) -> bool {
        match self.docker(&["inspect", "-f", "{{.State.Running}}", id]).await {
            Ok(output) if output.status.success() => {
                String::from_utf8_lossy(&output.stdout).trim() == "true"
            }
            Ok(output) => {
                warn!(
                    container = id,
                    stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                    "docker inspect failed"
                );
                false
            }
            Err(e) => {
                warn!(container = id, error = %e, "could not probe container");
                false
            }
        }
    }

    async fn logs(&self, id: &str) -> String {
        let tail = self.tail.to_string();
        match self.docker(&["logs", "--tail", &tail, id]).await {
            Ok(output) => {
                let mut logs = String::from_utf8_lossy(&output.stdout).into_owned();
                logs.push_str(&String::from_utf8_lossy(&output.stderr));
                logs
            }
            Err(e) => e,
        }
    }
}

/// For workers that are not containers, e.g. local processes in development.
#[derive(Debug, Default, Clone, Copy)]
pub struct AssumeAlive;

#[async_trait]
impl SandboxProbe for AssumeAlive {
    async fn is_running(&self, _id: &str) -> bool {
        true
    }

    async fn logs(&self, _id: &str) -> String {
        String::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_binary_means_not_running() {
        let probe = DockerProbe::new("/nonexistent/docker-binary");
        assert!(!probe.is_running("abc").await);
        assert!(probe.logs("abc").await.contains("failed to spawn"));
    }
}
