//! Sandbox execution limits.
//!
//! Every scenario runs in a fresh interpreter process. These settings bound
//! how long it may run, how much memory it may map, and how many worker
//! processes a fan-out scenario may start at once.

use serde::{Deserialize, Serialize};

/// Environment variable overriding the interpreter path
pub const PYTHON_ENV_VAR: &str = "PERFLAB_PYTHON";

fn default_python() -> String {
    "python3".to_string()
}
fn default_timeout_secs() -> f64 {
    10.0
}
fn default_grace_secs() -> f64 {
    5.0
}
fn default_max_scenario_secs() -> f64 {
    120.0
}
fn default_max_calls() -> u64 {
    10_000
}
fn default_max_worker_processes() -> usize {
    num_cpus::get().max(1)
}
fn default_max_threads_per_worker() -> u64 {
    64
}
fn default_memory_limit_mb() -> u64 {
    1024
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Interpreter used to run submissions
    #[serde(default = "default_python")]
    pub python: String,

    /// Hard wall-clock limit for baseline and memory scenarios (seconds)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: f64,

    /// Extra time granted past a fan-out scenario's own duration (seconds)
    #[serde(default = "default_grace_secs")]
    pub grace_secs: f64,

    /// Upper bound on any single scenario (seconds)
    #[serde(default = "default_max_scenario_secs")]
    pub max_scenario_secs: f64,

    /// Call budget shared by all workers of a fan-out scenario
    #[serde(default = "default_max_calls")]
    pub max_calls: u64,

    #[serde(default = "default_max_worker_processes")]
    pub max_worker_processes: usize,

    /// Logical users simulated as threads inside one worker process
    #[serde(default = "default_max_threads_per_worker")]
    pub max_threads_per_worker: u64,

    /// Address-space limit applied inside the sandbox, 0 disables it
    #[serde(default = "default_memory_limit_mb")]
    pub memory_limit_mb: u64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            python: default_python(),
            timeout_secs: default_timeout_secs(),
            grace_secs: default_grace_secs(),
            max_scenario_secs: default_max_scenario_secs(),
            max_calls: default_max_calls(),
            max_worker_processes: default_max_worker_processes(),
            max_threads_per_worker: default_max_threads_per_worker(),
            memory_limit_mb: default_memory_limit_mb(),
        }
    }
}

impl ExecutorConfig {
    /// Apply `PERFLAB_PYTHON` when set and non-empty.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(python) = std::env::var(PYTHON_ENV_VAR) {
            if !python.trim().is_empty() {
                self.python = python;
            }
        }
        self
    }
}
