use serde::{Deserialize, Serialize};

use super::analysis::{ClassifierConfig, RecommenderConfig, ScannerConfig};
use super::executor::ExecutorConfig;

/// Root configuration structure for perflab
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerflabConfig {
    #[serde(default)]
    pub scanner: ScannerConfig,

    #[serde(default)]
    pub classifier: ClassifierConfig,

    #[serde(default)]
    pub recommender: RecommenderConfig,

    #[serde(default)]
    pub executor: ExecutorConfig,
}

impl PerflabConfig {
    /// Check every section, collecting all problems instead of stopping at the first.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.scanner.max_source_bytes == 0 {
            errors.push("scanner.max_source_bytes must be greater than 0".to_string());
        }

        let min_confidence = self.classifier.min_confidence;
        if !(0.0..=1.0).contains(&min_confidence) {
            errors.push(format!(
                "classifier.min_confidence out of range: {} (must be 0.0-1.0)",
                min_confidence
            ));
        }

        let recommender = &self.recommender;
        if recommender.memory_data_size == 0 {
            errors.push("recommender.memory_data_size must be greater than 0".to_string());
        }
        if recommender.concurrency_users == 0 || recommender.load_users == 0 {
            errors.push("recommender user counts must be greater than 0".to_string());
        }
        if !is_positive(recommender.concurrency_duration_secs)
            || !is_positive(recommender.load_duration_secs)
        {
            errors.push("recommender durations must be positive".to_string());
        }

        let executor = &self.executor;
        if executor.python.trim().is_empty() {
            errors.push("executor.python must name an interpreter".to_string());
        }
        if !is_positive(executor.timeout_secs) || !is_positive(executor.max_scenario_secs) {
            errors.push("executor timeouts must be positive".to_string());
        }
        if executor.grace_secs < 0.0 || !executor.grace_secs.is_finite() {
            errors.push("executor.grace_secs must not be negative".to_string());
        }
        if executor.max_calls == 0 {
            errors.push("executor.max_calls must be greater than 0".to_string());
        }
        if executor.max_worker_processes == 0 {
            errors.push("executor.max_worker_processes must be greater than 0".to_string());
        }
        if executor.max_threads_per_worker == 0 {
            errors.push("executor.max_threads_per_worker must be greater than 0".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

fn is_positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}
