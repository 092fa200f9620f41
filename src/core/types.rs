//! Common type definitions used across the codebase

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Storage/architecture pattern a submission implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArchitectureType {
    InMemory,
    Database,
    Caching,
    Hybrid,
    Unknown,
}

impl ArchitectureType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InMemory => "in-memory",
            Self::Database => "database",
            Self::Caching => "caching",
            Self::Hybrid => "hybrid",
            Self::Unknown => "unknown",
        }
    }

    /// Map a caller's architecture label onto a profile. Free-form labels
    /// such as "single-tier" yield `None`.
    pub fn from_declared(label: &str) -> Option<Self> {
        let normalized: String = label
            .trim()
            .to_ascii_lowercase()
            .chars()
            .map(|c| if c == '_' || c == ' ' { '-' } else { c })
            .collect();
        match normalized.as_str() {
            "in-memory" | "inmemory" | "memory" => Some(Self::InMemory),
            "database" | "db" | "sql" => Some(Self::Database),
            "caching" | "cache" | "cached" => Some(Self::Caching),
            "hybrid" | "cache-aside" => Some(Self::Hybrid),
            _ => None,
        }
    }

    /// Profiles backed by an external store.
    pub fn is_persistent(&self) -> bool {
        matches!(self, Self::Database | Self::Caching | Self::Hybrid)
    }
}

impl fmt::Display for ArchitectureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Best-matching architecture for a submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchitectureProfile {
    #[serde(rename = "type")]
    pub architecture_type: ArchitectureType,
    /// Always within `[0, 1]`
    pub confidence: f64,
    /// Names of matched predicates, in evaluation order
    pub detected_features: Vec<String>,
    /// Raw import list, echoed from the scanner
    pub imports: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightType {
    Correctness,
    Performance,
    Scalability,
    Style,
}

impl fmt::Display for InsightType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Correctness => "correctness",
            Self::Performance => "performance",
            Self::Scalability => "scalability",
            Self::Style => "style",
        };
        f.write_str(name)
    }
}

/// Severity levels for insights, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        };
        f.write_str(name)
    }
}

/// A single educational finding about the analyzed code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Insight {
    #[serde(rename = "type")]
    pub insight_type: InsightType,
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
    pub severity: Severity,
    /// Identifier of the rule that produced this insight
    pub rule: String,
    /// Source line of the first occurrence, when tied to one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestType {
    Baseline,
    Memory,
    Concurrency,
    Load,
}

impl TestType {
    pub const ALL: [TestType; 4] = [
        TestType::Baseline,
        TestType::Memory,
        TestType::Concurrency,
        TestType::Load,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Baseline => "baseline",
            Self::Memory => "memory",
            Self::Concurrency => "concurrency",
            Self::Load => "load",
        }
    }
}

impl fmt::Display for TestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownTestType(pub String);

impl fmt::Display for UnknownTestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let expected: Vec<&str> = TestType::ALL.iter().map(TestType::as_str).collect();
        write!(
            f,
            "unsupported test type '{}'; expected one of: {}",
            self.0,
            expected.join(", ")
        )
    }
}

impl std::error::Error for UnknownTestType {}

impl FromStr for TestType {
    type Err = UnknownTestType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        TestType::ALL
            .into_iter()
            .find(|t| t.as_str() == normalized)
            .ok_or_else(|| UnknownTestType(s.to_string()))
    }
}

/// Named knobs for a scenario. Absent knobs fall back to executor defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioParameters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iterations: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_count: Option<u64>,
    /// Seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_calls: Option<u64>,
}

/// A named, parameterized performance test description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestScenario {
    pub name: String,
    pub test_type: TestType,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub parameters: ScenarioParameters,
}

/// A scenario as supplied by a caller, before `test_type` is checked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTestScenario {
    #[serde(default)]
    pub name: String,
    pub test_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub parameters: ScenarioParameters,
}

impl RawTestScenario {
    pub fn validate(self) -> Result<TestScenario, UnknownTestType> {
        let test_type: TestType = self.test_type.parse()?;
        let name = if self.name.trim().is_empty() {
            format!("Ad-hoc {} test", test_type)
        } else {
            self.name
        };
        Ok(TestScenario {
            name,
            test_type,
            description: self.description,
            parameters: self.parameters,
        })
    }
}

/// Measured outcome of running one scenario.
///
/// `success == false` always carries a non-empty `error`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub test_name: String,
    pub success: bool,
    #[serde(default)]
    pub metrics: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExecutionResult {
    pub fn passed(test_name: impl Into<String>, metrics: BTreeMap<String, f64>) -> Self {
        Self {
            test_name: test_name.into(),
            success: true,
            metrics,
            error: None,
        }
    }

    pub fn failed(
        test_name: impl Into<String>,
        error: impl Into<String>,
        metrics: BTreeMap<String, f64>,
    ) -> Self {
        let mut error = error.into();
        if error.trim().is_empty() {
            error = "execution failed without a message".to_string();
        }
        Self {
            test_name: test_name.into(),
            success: false,
            metrics,
            error: Some(error),
        }
    }

    pub fn metric(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).copied()
    }
}

/// Caller-supplied description of the intended system.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemDiagram {
    #[serde(default)]
    pub components: Vec<String>,
    /// Compared against the detected profile when it names one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub architecture: Option<String>,
}

/// Static estimate of runtime characteristics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceSummary {
    pub estimated_memory_usage: String,
    pub estimated_concurrency: String,
    /// 1 (poor) to 10 (good)
    pub scalability_rating: u8,
}

/// Aggregate result of one analysis request. Never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub architecture: ArchitectureProfile,
    pub insights: Vec<Insight>,
    pub recommended_tests: Vec<TestScenario>,
    pub performance_metrics: PerformanceSummary,
}
