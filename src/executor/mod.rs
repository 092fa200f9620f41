//! Isolated execution of submissions under a test scenario.
//!
//! [`PerformanceExecutor::execute`] never fails outward: interpreter
//! problems, faults in submitted code and timeouts all come back as an
//! [`ExecutionResult`] with `success == false`.

pub mod aggregate;
mod sandbox;

use crate::config::ExecutorConfig;
use crate::core::{ExecutionResult, ScenarioParameters, TestScenario, TestType};
use crate::observability::{set_current_scenario, set_phase, AnalysisPhase};
use crate::scanner::{SourceFacts, SourceScanner};
use aggregate::Metrics;
use sandbox::{EntryPoint, HarnessMode, HarnessReport, Sandbox, SandboxError};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tracing::{debug, info, info_span, warn, Instrument};

const DEFAULT_ITERATIONS: u64 = 1;
const DEFAULT_DATA_SIZE: u64 = 1000;
const DEFAULT_CONCURRENCY_USERS: u64 = 10;
const DEFAULT_CONCURRENCY_SECS: f64 = 5.0;
const DEFAULT_LOAD_USERS: u64 = 50;
const DEFAULT_LOAD_SECS: f64 = 10.0;
const MIN_DURATION_SECS: f64 = 0.1;

#[derive(Debug, Clone)]
pub struct PerformanceExecutor {
    config: ExecutorConfig,
    scanner: SourceScanner,
}

impl Default for PerformanceExecutor {
    fn default() -> Self {
        Self::new(&ExecutorConfig::default(), SourceScanner::default())
    }
}

impl PerformanceExecutor {
    pub fn new(config: &ExecutorConfig, scanner: SourceScanner) -> Self {
        Self {
            config: config.clone(),
            scanner,
        }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// True when the configured interpreter can be found.
    pub fn is_available(&self) -> bool {
        which::which(&self.config.python).is_ok()
    }

    pub async fn execute(&self, code: &str, scenario: &TestScenario) -> ExecutionResult {
        match self.scanner.scan(code) {
            Ok(facts) => self.execute_with_facts(code, &facts, scenario).await,
            Err(e) => ExecutionResult::failed(&scenario.name, e.to_string(), Metrics::new()),
        }
    }

    /// Run a scenario using facts already extracted from `code`.
    pub async fn execute_with_facts(
        &self,
        code: &str,
        facts: &SourceFacts,
        scenario: &TestScenario,
    ) -> ExecutionResult {
        let span = info_span!(
            "execute",
            scenario = %scenario.name,
            test_type = %scenario.test_type
        );
        async {
            let started = Instant::now();
            let result = match self.run_scenario(code, facts, scenario).await {
                Ok(result) => result,
                Err(e) => {
                    let partial = e.partial_metrics();
                    ExecutionResult::failed(&scenario.name, e.to_string(), partial)
                }
            };
            if result.success {
                info!(elapsed_ms = started.elapsed().as_millis() as u64, "scenario passed");
            } else {
                warn!(
                    error = result.error.as_deref().unwrap_or_default(),
                    "scenario failed"
                );
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn run_scenario(
        &self,
        code: &str,
        facts: &SourceFacts,
        scenario: &TestScenario,
    ) -> Result<ExecutionResult, SandboxError> {
        let entry_points: Vec<EntryPoint> = facts
            .entry_points()
            .into_iter()
            .map(|f| EntryPoint {
                name: f.name.clone(),
                required: f.required,
            })
            .collect();
        if entry_points.is_empty() && scenario.test_type != TestType::Baseline {
            return Err(SandboxError::Rejected(
                "no public top-level functions to call".to_string(),
            ));
        }

        let sandbox = {
            let _phase = set_phase(AnalysisPhase::Execution);
            let _scenario = set_current_scenario(scenario.name.as_str());
            Sandbox::create(&self.config.python, code)?
        };
        let params = &scenario.parameters;

        match scenario.test_type {
            TestType::Baseline => {
                let mut job = self.single_job(&sandbox, HarnessMode::Baseline, entry_points);
                job.iterations = params.iterations.unwrap_or(DEFAULT_ITERATIONS).max(1);
                let report = sandbox.run(&job, secs(self.config.timeout_secs)).await?;
                Ok(into_result(&scenario.name, report))
            }
            TestType::Memory => {
                let mut job = self.single_job(&sandbox, HarnessMode::Memory, entry_points);
                job.data_size = params.data_size.unwrap_or(DEFAULT_DATA_SIZE).max(1);
                let report = sandbox.run(&job, secs(self.config.timeout_secs)).await?;
                Ok(into_result(&scenario.name, report))
            }
            TestType::Concurrency | TestType::Load => {
                let plan = FanOutPlan::new(&self.config, scenario.test_type, params);
                self.fan_out(sandbox, entry_points, &scenario.name, plan).await
            }
        }
    }

    fn single_job(
        &self,
        sandbox: &Sandbox,
        mode: HarnessMode,
        entry_points: Vec<EntryPoint>,
    ) -> sandbox::HarnessJob {
        let mut job = sandbox.job(mode, "main");
        job.entry_points = entry_points;
        job.memory_limit_mb = self.config.memory_limit_mb;
        job.cpu_limit_secs = cpu_limit(self.config.timeout_secs);
        job
    }

    /// Spawn one worker process per share of users and aggregate after the barrier.
    async fn fan_out(
        &self,
        sandbox: Sandbox,
        entry_points: Vec<EntryPoint>,
        test_name: &str,
        plan: FanOutPlan,
    ) -> Result<ExecutionResult, SandboxError> {
        let sandbox = Arc::new(sandbox);
        let hard_timeout = secs(plan.deadline_secs + self.config.grace_secs);
        debug!(
            users = plan.users,
            workers = plan.workers,
            deadline_secs = plan.deadline_secs,
            "fanning out"
        );

        let started = Instant::now();
        let mut set = JoinSet::new();
        for (worker_id, (threads, budget)) in plan.worker_shares().into_iter().enumerate() {
            let mut job = sandbox.job(HarnessMode::Worker, &format!("worker-{}", worker_id));
            job.entry_points = entry_points.clone();
            job.worker_id = worker_id;
            job.threads = threads;
            job.max_calls = budget;
            job.deadline_secs = plan.deadline_secs;
            job.memory_limit_mb = self.config.memory_limit_mb;
            job.cpu_limit_secs = cpu_limit(plan.deadline_secs + self.config.grace_secs);

            let sandbox = Arc::clone(&sandbox);
            set.spawn(async move { sandbox.run(&job, hard_timeout).await });
        }

        let mut snapshots: Vec<Metrics> = Vec::new();
        let mut first_error: Option<String> = None;
        let mut fatal: Option<SandboxError> = None;
        let mut timed_out = false;

        let barrier = tokio::time::timeout(hard_timeout + Duration::from_secs(1), async {
            while let Some(joined) = set.join_next().await {
                match joined {
                    Ok(Ok(report)) if report.ok => {
                        if first_error.is_none() {
                            first_error = report.error;
                        }
                        snapshots.push(report.metrics);
                    }
                    Ok(Ok(report)) => {
                        fatal.get_or_insert(SandboxError::Rejected(
                            report.error.unwrap_or_else(|| "worker failed".to_string()),
                        ));
                    }
                    Ok(Err(SandboxError::Timeout { partial })) => {
                        timed_out = true;
                        snapshots.push(partial);
                    }
                    Ok(Err(e)) => {
                        fatal.get_or_insert(e);
                    }
                    Err(join_error) => {
                        fatal.get_or_insert(SandboxError::Rejected(format!(
                            "worker task failed: {}",
                            join_error
                        )));
                    }
                }
            }
        })
        .await;
        if barrier.is_err() {
            set.abort_all();
            timed_out = true;
        }

        let elapsed = started.elapsed().as_secs_f64();
        let metrics = aggregate::combine(&snapshots, elapsed, plan.test_type == TestType::Load);

        if let Some(e) = fatal {
            return Ok(ExecutionResult::failed(test_name, e.to_string(), metrics));
        }
        if timed_out {
            return Err(SandboxError::Timeout { partial: metrics });
        }

        let errors = metrics.get("error_count").copied().unwrap_or(0.0);
        let total = metrics.get("total_calls").copied().unwrap_or(0.0);
        if errors > 0.0 {
            let message = format!(
                "{} of {} calls failed; first error: {}",
                errors,
                total,
                first_error.unwrap_or_else(|| "unknown".to_string())
            );
            return Ok(ExecutionResult::failed(test_name, message, metrics));
        }
        if total == 0.0 {
            return Ok(ExecutionResult::failed(
                test_name,
                "no calls completed before the deadline",
                metrics,
            ));
        }
        Ok(ExecutionResult::passed(test_name, metrics))
    }
}

/// Resolved knobs for a concurrency or load scenario.
#[derive(Debug, Clone, Copy, PartialEq)]
struct FanOutPlan {
    test_type: TestType,
    users: u64,
    workers: usize,
    deadline_secs: f64,
    max_calls: u64,
    max_threads: u64,
}

impl FanOutPlan {
    fn new(config: &ExecutorConfig, test_type: TestType, params: &ScenarioParameters) -> Self {
        let (default_users, default_secs) = match test_type {
            TestType::Load => (DEFAULT_LOAD_USERS, DEFAULT_LOAD_SECS),
            _ => (DEFAULT_CONCURRENCY_USERS, DEFAULT_CONCURRENCY_SECS),
        };
        let users = params.user_count.unwrap_or(default_users).max(1);
        let duration = params
            .duration
            .filter(|d| d.is_finite() && *d > 0.0)
            .unwrap_or(default_secs);
        let workers = users.min(config.max_worker_processes.max(1) as u64) as usize;
        Self {
            test_type,
            users,
            workers,
            deadline_secs: duration.clamp(
                MIN_DURATION_SECS,
                config.max_scenario_secs.max(MIN_DURATION_SECS),
            ),
            max_calls: params.max_calls.unwrap_or(config.max_calls).max(1),
            max_threads: config.max_threads_per_worker.max(1),
        }
    }

    /// `(threads, call budget)` per worker. A worker never starts more
    /// threads than it has calls to make.
    fn worker_shares(&self) -> Vec<(u64, u64)> {
        let threads = aggregate::split_evenly(self.users, self.workers);
        let budgets =
            aggregate::split_evenly(self.max_calls.max(self.workers as u64), self.workers);
        threads
            .into_iter()
            .zip(budgets)
            .map(|(threads, budget)| (threads.min(budget).min(self.max_threads).max(1), budget))
            .collect()
    }
}

fn into_result(test_name: &str, report: HarnessReport) -> ExecutionResult {
    if report.ok {
        ExecutionResult::passed(test_name, report.metrics)
    } else {
        ExecutionResult::failed(
            test_name,
            report.error.unwrap_or_default(),
            report.metrics,
        )
    }
}

fn secs(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(Duration::from_secs(1))
}

/// CPU-seconds limit for a run with the given wall-clock budget.
fn cpu_limit(wall_secs: f64) -> u64 {
    if wall_secs.is_finite() && wall_secs > 0.0 {
        wall_secs.ceil() as u64 + 1
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(user_count: Option<u64>, duration: Option<f64>) -> ScenarioParameters {
        ScenarioParameters {
            user_count,
            duration,
            ..Default::default()
        }
    }

    #[test]
    fn test_plan_caps_workers_and_duration() {
        let config = ExecutorConfig {
            max_worker_processes: 4,
            max_scenario_secs: 30.0,
            ..Default::default()
        };
        let plan = FanOutPlan::new(&config, TestType::Load, &params(Some(50), Some(90.0)));
        assert_eq!(plan.users, 50);
        assert_eq!(plan.workers, 4);
        assert_eq!(plan.deadline_secs, 30.0);
        assert_eq!(plan.max_calls, 10_000);
    }

    #[test]
    fn test_plan_defaults_by_type() {
        let config = ExecutorConfig::default();
        let plan = FanOutPlan::new(&config, TestType::Concurrency, &params(None, Some(-1.0)));
        assert_eq!(plan.users, DEFAULT_CONCURRENCY_USERS);
        assert_eq!(plan.deadline_secs, DEFAULT_CONCURRENCY_SECS);
        let plan = FanOutPlan::new(&config, TestType::Concurrency, &params(Some(0), None));
        assert_eq!(plan.users, 1);
        assert_eq!(plan.workers, 1);
    }

    #[test]
    fn test_worker_threads_bounded_by_budget() {
        let config = ExecutorConfig {
            max_worker_processes: 4,
            max_threads_per_worker: 64,
            ..Default::default()
        };
        let mut huge = params(Some(200_000), Some(1.0));
        huge.max_calls = Some(100);
        let plan = FanOutPlan::new(&config, TestType::Load, &huge);
        let shares = plan.worker_shares();
        assert_eq!(shares.len(), 4);
        assert!(shares.iter().all(|&(threads, budget)| threads <= budget));
        assert_eq!(shares.iter().map(|s| s.1).sum::<u64>(), 100);

        let plan = FanOutPlan::new(&config, TestType::Load, &params(Some(200_000), Some(1.0)));
        assert!(plan.worker_shares().iter().all(|&(threads, _)| threads == 64));

        let plan = FanOutPlan::new(&config, TestType::Concurrency, &params(Some(6), None));
        let threads: Vec<u64> = plan.worker_shares().iter().map(|s| s.0).collect();
        assert_eq!(threads, vec![2, 2, 1, 1]);
    }

    #[test]
    fn test_secs_tolerates_bad_values() {
        assert_eq!(secs(f64::NAN), Duration::from_secs(1));
        assert_eq!(secs(2.5), Duration::from_millis(2500));
    }

    #[test]
    fn test_cpu_limit_rounds_up() {
        assert_eq!(cpu_limit(10.0), 11);
        assert_eq!(cpu_limit(0.2), 2);
        assert_eq!(cpu_limit(f64::INFINITY), 0);
    }

    #[tokio::test]
    async fn test_missing_interpreter_is_a_local_failure() {
        let config = ExecutorConfig {
            python: "no-such-python-interpreter".to_string(),
            ..Default::default()
        };
        let executor = PerformanceExecutor::new(&config, SourceScanner::default());
        assert!(!executor.is_available());
        let scenario = TestScenario {
            name: "Baseline Performance".into(),
            test_type: TestType::Baseline,
            description: String::new(),
            parameters: ScenarioParameters::default(),
        };
        let result = executor.execute("def f():\n    return 1\n", &scenario).await;
        assert!(!result.success);
        assert!(result.error.unwrap().contains("no-such-python-interpreter"));
    }

    #[tokio::test]
    async fn test_empty_code_is_rejected_before_spawning() {
        let executor = PerformanceExecutor::default();
        let scenario = TestScenario {
            name: "Load Test".into(),
            test_type: TestType::Load,
            description: String::new(),
            parameters: ScenarioParameters::default(),
        };
        let result = executor.execute("  ", &scenario).await;
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("code is empty"));
    }
}
