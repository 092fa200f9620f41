pub mod errors;
pub mod types;

pub use errors::{Error, InputError, Result};
pub use types::{
    AnalysisReport, ArchitectureProfile, ArchitectureType, ExecutionResult, Insight, InsightType,
    PerformanceSummary, RawTestScenario, ScenarioParameters, Severity, SystemDiagram,
    TestScenario, TestType, UnknownTestType,
};
