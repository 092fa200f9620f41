//! Disposable interpreter processes for running submissions.
//!
//! A [`Sandbox`] owns a private temporary directory holding the submission
//! and the harness script. Every [`Sandbox::run`] spawns a fresh
//! interpreter, so no module state survives between runs. The child is
//! killed when its future is dropped and the directory is removed when the
//! sandbox is dropped.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tempfile::TempDir;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

const HARNESS_SOURCE: &str = include_str!("harness.py");
const SUBMISSION_FILE: &str = "submission.py";
const HARNESS_FILE: &str = "harness.py";
const STDERR_TAIL_CHARS: usize = 2000;

/// Failures of the execution machinery itself. These end up in an
/// `ExecutionResult` and never escape the executor.
#[derive(Debug, Error)]
pub(crate) enum SandboxError {
    #[error("python interpreter '{0}' was not found")]
    InterpreterMissing(String),

    #[error("failed to prepare sandbox: {0}")]
    Setup(#[source] std::io::Error),

    #[error("failed to start interpreter: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("interpreter stopped reading its job: {0}")]
    JobDelivery(#[source] std::io::Error),

    #[error("failed waiting for interpreter: {0}")]
    Wait(#[source] std::io::Error),

    #[error("timeout")]
    Timeout { partial: BTreeMap<String, f64> },

    #[error("interpreter exited with {status} before reporting: {stderr}")]
    Crashed { status: String, stderr: String },

    #[error("unreadable harness report: {0}")]
    Protocol(String),

    #[error("{0}")]
    Rejected(String),
}

impl SandboxError {
    pub(crate) fn partial_metrics(&self) -> BTreeMap<String, f64> {
        match self {
            Self::Timeout { partial } => partial.clone(),
            _ => BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum HarnessMode {
    Baseline,
    Memory,
    Worker,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct EntryPoint {
    pub name: String,
    pub required: usize,
}

/// Job description sent to the harness on stdin.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct HarnessJob {
    pub mode: HarnessMode,
    pub source_path: PathBuf,
    pub result_path: PathBuf,
    pub checkpoint_path: PathBuf,
    pub entry_points: Vec<EntryPoint>,
    pub iterations: u64,
    pub data_size: u64,
    pub worker_id: usize,
    pub threads: u64,
    pub max_calls: u64,
    pub deadline_secs: f64,
    pub memory_limit_mb: u64,
    pub cpu_limit_secs: u64,
}

/// Report written by the harness to `result_path`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub(crate) struct HarnessReport {
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub metrics: BTreeMap<String, f64>,
}

#[derive(Debug)]
pub(crate) struct Sandbox {
    dir: TempDir,
    python: PathBuf,
}

impl Sandbox {
    pub(crate) fn create(python: &str, code: &str) -> Result<Self, SandboxError> {
        let python =
            which::which(python).map_err(|_| SandboxError::InterpreterMissing(python.to_string()))?;
        let dir = tempfile::Builder::new()
            .prefix("perflab-")
            .tempdir()
            .map_err(SandboxError::Setup)?;
        std::fs::write(dir.path().join(SUBMISSION_FILE), code).map_err(SandboxError::Setup)?;
        std::fs::write(dir.path().join(HARNESS_FILE), HARNESS_SOURCE).map_err(SandboxError::Setup)?;
        debug!(dir = %dir.path().display(), python = %python.display(), "sandbox created");
        Ok(Self { dir, python })
    }

    pub(crate) fn path(&self) -> &Path {
        self.dir.path()
    }

    /// A job with this sandbox's file layout and neutral knobs.
    pub(crate) fn job(&self, mode: HarnessMode, label: &str) -> HarnessJob {
        HarnessJob {
            mode,
            source_path: self.path().join(SUBMISSION_FILE),
            result_path: self.path().join(format!("result-{}.json", label)),
            checkpoint_path: self.path().join(format!("checkpoint-{}.json", label)),
            entry_points: Vec::new(),
            iterations: 1,
            data_size: 1,
            worker_id: 0,
            threads: 1,
            max_calls: 1,
            deadline_secs: 0.0,
            memory_limit_mb: 0,
            cpu_limit_secs: 0,
        }
    }

    /// Run one job in a fresh interpreter, killing it after `hard_timeout`.
    pub(crate) async fn run(
        &self,
        job: &HarnessJob,
        hard_timeout: Duration,
    ) -> Result<HarnessReport, SandboxError> {
        let payload = serde_json::to_vec(job).map_err(|e| SandboxError::Protocol(e.to_string()))?;

        let mut child = Command::new(&self.python)
            .arg("-I")
            .arg(self.path().join(HARNESS_FILE))
            .current_dir(self.path())
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(SandboxError::Spawn)?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(&payload)
                .await
                .map_err(SandboxError::JobDelivery)?;
            stdin.shutdown().await.map_err(SandboxError::JobDelivery)?;
        }

        let output = match tokio::time::timeout(hard_timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return Err(SandboxError::Wait(e)),
            Err(_) => {
                debug!(mode = ?job.mode, worker = job.worker_id, "harness killed on timeout");
                return Err(SandboxError::Timeout {
                    partial: read_metrics(&job.checkpoint_path).unwrap_or_default(),
                });
            }
        };

        match std::fs::read(&job.result_path) {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| SandboxError::Protocol(e.to_string())),
            Err(_) => Err(SandboxError::Crashed {
                status: output.status.to_string(),
                stderr: stderr_tail(&output.stderr),
            }),
        }
    }
}

fn read_metrics(path: &Path) -> Option<BTreeMap<String, f64>> {
    let bytes = std::fs::read(path).ok()?;
    serde_json::from_slice(&bytes).ok()
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let text = text.trim();
    if text.is_empty() {
        return "no output".to_string();
    }
    let chars: Vec<char> = text.chars().collect();
    let start = chars.len().saturating_sub(STDERR_TAIL_CHARS);
    chars[start..].iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_interpreter_is_reported() {
        let err = Sandbox::create("definitely-not-a-python-binary-xyz", "x = 1").unwrap_err();
        assert!(matches!(err, SandboxError::InterpreterMissing(_)));
        assert!(err.to_string().contains("definitely-not-a-python-binary-xyz"));
    }

    #[test]
    fn test_timeout_error_text_is_exact() {
        let err = SandboxError::Timeout {
            partial: BTreeMap::new(),
        };
        assert_eq!(err.to_string(), "timeout");
    }

    #[test]
    fn test_stderr_tail_keeps_the_end() {
        let long = "x".repeat(STDERR_TAIL_CHARS) + "Traceback end";
        assert!(stderr_tail(long.as_bytes()).ends_with("Traceback end"));
        assert_eq!(stderr_tail(b"   "), "no output");
    }

    fn python() -> Option<String> {
        which::which("python3")
            .ok()
            .map(|p| p.to_string_lossy().into_owned())
    }

    #[tokio::test]
    async fn test_baseline_timeout_keeps_checkpointed_calls() {
        let Some(python) = python() else {
            return;
        };
        let code = "import time\n\ndef slow():\n    time.sleep(0.05)\n";
        let sandbox = Sandbox::create(&python, code).unwrap();
        let mut job = sandbox.job(HarnessMode::Baseline, "main");
        job.entry_points = vec![EntryPoint {
            name: "slow".into(),
            required: 0,
        }];
        job.iterations = 10_000;

        let err = sandbox
            .run(&job, Duration::from_millis(1500))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "timeout");
        let partial = err.partial_metrics();
        assert!(partial.get("calls").copied().unwrap_or_default() >= 1.0, "{partial:?}");
        assert!(partial.contains_key("execution_time"));
    }

    #[tokio::test]
    async fn test_child_that_never_reads_is_a_delivery_error() {
        let Some(python) = python() else {
            return;
        };
        let sandbox = Sandbox::create(&python, "x = 1").unwrap();
        std::fs::write(sandbox.path().join(HARNESS_FILE), "import os\nos._exit(3)\n").unwrap();
        let mut job = sandbox.job(HarnessMode::Baseline, "main");
        job.entry_points = (0..20_000)
            .map(|i| EntryPoint {
                name: format!("entry_point_number_{i}"),
                required: 0,
            })
            .collect();

        let err = sandbox.run(&job, Duration::from_secs(10)).await.unwrap_err();
        assert!(matches!(err, SandboxError::JobDelivery(_)), "{err}");
        assert!(err.to_string().starts_with("interpreter stopped reading its job"));
    }

    #[test]
    fn test_job_serializes_mode_lowercase() {
        let Ok(python) = which::which("python3") else {
            return;
        };
        let sandbox = Sandbox::create(&python.to_string_lossy(), "x = 1").unwrap();
        let job = sandbox.job(HarnessMode::Worker, "w0");
        let json = serde_json::to_value(&job).unwrap();
        assert_eq!(json["mode"], "worker");
        assert!(job.result_path.starts_with(sandbox.path()));
    }
}
