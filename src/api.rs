//! Request and response envelopes for the three external contracts.
//!
//! Handlers never return `Err`: every failure becomes `success: false` with
//! a message. Failures inside a scenario stay inside its `ExecutionResult`.

use crate::core::{AnalysisReport, Error, ExecutionResult, RawTestScenario, SystemDiagram};
use crate::orchestrator::AnalysisEngine;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_diagram: Option<SystemDiagram>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeAndTestRequest {
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_diagram: Option<SystemDiagram>,
    #[serde(default)]
    pub run_all_tests: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceTestRequest {
    pub code: String,
    pub test_scenario: RawTestScenario,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<AnalysisReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeAndTestResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<AnalysisReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performance_results: Option<Vec<ExecutionResult>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceTestResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_result: Option<ExecutionResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AnalyzeResponse {
    fn failure(error: &Error) -> Self {
        Self {
            success: false,
            analysis: None,
            error: Some(error.to_string()),
        }
    }
}

impl AnalyzeAndTestResponse {
    fn failure(error: &Error) -> Self {
        Self {
            success: false,
            analysis: None,
            performance_results: None,
            error: Some(error.to_string()),
        }
    }
}

impl PerformanceTestResponse {
    fn failure(error: &Error) -> Self {
        Self {
            success: false,
            test_result: None,
            error: Some(error.to_string()),
        }
    }
}

fn log_rejection(contract: &str, error: &Error) {
    if error.is_client_error() {
        debug!(contract, %error, "request rejected");
    } else {
        warn!(contract, %error, "request failed");
    }
}

pub fn handle_analyze(engine: &AnalysisEngine, request: &AnalyzeRequest) -> AnalyzeResponse {
    match engine.analyze(&request.code, request.system_diagram.as_ref()) {
        Ok(analysis) => AnalyzeResponse {
            success: true,
            analysis: Some(analysis),
            error: None,
        },
        Err(e) => {
            log_rejection("analyze", &e);
            AnalyzeResponse::failure(&e)
        }
    }
}

pub async fn handle_analyze_and_test(
    engine: &AnalysisEngine,
    request: &AnalyzeAndTestRequest,
) -> AnalyzeAndTestResponse {
    let outcome = engine
        .analyze_and_test(
            &request.code,
            request.system_diagram.as_ref(),
            request.run_all_tests,
        )
        .await;
    match outcome {
        Ok(tested) => AnalyzeAndTestResponse {
            success: true,
            analysis: Some(tested.analysis),
            performance_results: Some(tested.performance_results),
            error: None,
        },
        Err(e) => {
            log_rejection("analyze_and_test", &e);
            AnalyzeAndTestResponse::failure(&e)
        }
    }
}

pub async fn handle_performance_test(
    engine: &AnalysisEngine,
    request: PerformanceTestRequest,
) -> PerformanceTestResponse {
    match engine
        .performance_test(&request.code, request.test_scenario)
        .await
    {
        Ok(result) => PerformanceTestResponse {
            success: true,
            test_result: Some(result),
            error: None,
        },
        Err(e) => {
            log_rejection("performance_test", &e);
            PerformanceTestResponse::failure(&e)
        }
    }
}
