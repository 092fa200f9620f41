use serde::{Deserialize, Serialize};

fn default_max_source_bytes() -> usize {
    100_000
}

fn default_min_confidence() -> f64 {
    0.3
}

fn default_memory_data_size() -> u64 {
    1000
}
fn default_concurrency_users() -> u64 {
    10
}
fn default_concurrency_duration_secs() -> f64 {
    5.0
}
fn default_load_users() -> u64 {
    50
}
fn default_load_duration_secs() -> f64 {
    10.0
}
fn default_users_per_component() -> u64 {
    5
}

/// Source scanner limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// Submissions larger than this are rejected before scanning
    #[serde(default = "default_max_source_bytes")]
    pub max_source_bytes: usize,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            max_source_bytes: default_max_source_bytes(),
        }
    }
}

/// Architecture classifier thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Top scores below this classify as `unknown`
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            min_confidence: default_min_confidence(),
        }
    }
}

/// Default knobs for recommended scenarios.
///
/// Declared diagram components raise the user counts by
/// `users_per_component` each.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommenderConfig {
    #[serde(default = "default_memory_data_size")]
    pub memory_data_size: u64,

    #[serde(default = "default_concurrency_users")]
    pub concurrency_users: u64,

    #[serde(default = "default_concurrency_duration_secs")]
    pub concurrency_duration_secs: f64,

    #[serde(default = "default_load_users")]
    pub load_users: u64,

    #[serde(default = "default_load_duration_secs")]
    pub load_duration_secs: f64,

    #[serde(default = "default_users_per_component")]
    pub users_per_component: u64,
}

impl Default for RecommenderConfig {
    fn default() -> Self {
        Self {
            memory_data_size: default_memory_data_size(),
            concurrency_users: default_concurrency_users(),
            concurrency_duration_secs: default_concurrency_duration_secs(),
            load_users: default_load_users(),
            load_duration_secs: default_load_duration_secs(),
            users_per_component: default_users_per_component(),
        }
    }
}
