// Export modules for library usage
pub mod api;
pub mod classifier;
pub mod cli;
pub mod commands;
pub mod config;
pub mod core;
pub mod executor;
pub mod insights;
pub mod observability;
pub mod orchestrator;
pub mod output;
pub mod recommend;
pub mod scanner;

// Re-export commonly used types
pub use crate::core::{
    AnalysisReport, ArchitectureProfile, ArchitectureType, Error, ExecutionResult, InputError,
    Insight, InsightType, PerformanceSummary, RawTestScenario, Result, ScenarioParameters,
    Severity, SystemDiagram, TestScenario, TestType,
};

pub use crate::orchestrator::{AnalysisEngine, TestedAnalysis};

pub use crate::api::{
    handle_analyze, handle_analyze_and_test, handle_performance_test, AnalyzeAndTestRequest,
    AnalyzeAndTestResponse, AnalyzeRequest, AnalyzeResponse, PerformanceTestRequest,
    PerformanceTestResponse,
};

pub use crate::classifier::ArchitectureClassifier;
pub use crate::executor::PerformanceExecutor;
pub use crate::insights::InsightGenerator;
pub use crate::recommend::TestRecommender;
pub use crate::scanner::{SourceFacts, SourceScanner};
